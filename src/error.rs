//! Error taxonomy for the client.
//!
//! Parse failures are contained inside the session and only logged. Call
//! failures always reach the caller that issued the call. Authentication
//! failures end the session.

use crate::networking::rpc::RpcError;
use thiserror::Error;

/// Code carried by the error object a timed-out call resolves with.
pub const TIMEOUT_CODE: i64 = -1;

/// Failure to produce or check a signature.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SigningError {
    #[error("invalid secret key: {0}")]
    InvalidKey(String),
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    #[error("invalid uint256 `{0}`")]
    InvalidUint(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("could not recover signer: {0}")]
    Recovery(String),
}

impl From<secp256k1::Error> for SigningError {
    fn from(err: secp256k1::Error) -> Self {
        SigningError::InvalidSignature(err.to_string())
    }
}

/// A frame that could not be decoded. Dropped by the session.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid envelope: {0}")]
    Envelope(serde_json::Error),
    #[error("envelope has no message")]
    MissingMessage,
    #[error("invalid rpc message: {0}")]
    Message(serde_json::Error),
}

/// Outcome of a call that did not produce a result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallError {
    #[error("{}", .0.message)]
    Timeout(RpcError),
    #[error("remote error {}: {}", .0.code, .0.message)]
    Remote(RpcError),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("malformed result: {0}")]
    MalformedResult(String),
    #[error("intent has no address")]
    MissingAddress,
    #[error("could not encode request: {0}")]
    Encode(String),
}

impl CallError {
    /// A timeout for the call with the given id, `{message, code: -1}` on the wire.
    pub fn timeout(id: u64) -> Self {
        CallError::Timeout(RpcError::new(
            format!("Request timed out. [{}]", id),
            TIMEOUT_CODE,
        ))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout(_))
    }

    /// Renders the error in the wire shape used for error responses.
    pub fn rpc_error(&self) -> RpcError {
        match self {
            CallError::Timeout(error) | CallError::Remote(error) => error.clone(),
            other => RpcError::new(other.to_string(), TIMEOUT_CODE),
        }
    }
}

/// Failure of the session as a whole.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("address is not authorized")]
    AuthRejected,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
    #[error("transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_wire_shape() {
        let error = CallError::timeout(1234);
        assert!(error.is_timeout());
        let rpc_error = error.rpc_error();
        assert_eq!(rpc_error.code, -1);
        assert_eq!(rpc_error.message, "Request timed out. [1234]");
        assert_eq!(error.to_string(), "Request timed out. [1234]");
    }

    #[test]
    fn test_remote_error_is_verbatim() {
        let remote = RpcError::new("no liquidity", 42);
        let error = CallError::Remote(remote.clone());
        assert!(!error.is_timeout());
        assert_eq!(error.rpc_error(), remote);
    }
}
