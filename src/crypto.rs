//! Hashing, addresses and recoverable signatures.
//!
//! Addresses and signatures use the Ethereum conventions the exchange
//! contract verifies against: keccak-256, 20-byte addresses taken from the
//! public key hash, and 65-byte `r‖s‖v` signatures over the
//! personal-message hash.

use crate::error::SigningError;
use secp256k1::recovery::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SECP256K1};
use sha3::{Digest, Keccak256};
use std::convert::TryInto;
use std::fmt;

pub type Keccak256Hash = [u8; 32];
pub type AddressBytes = [u8; 20];

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Offset between a raw recovery id and the `v` the contract expects.
pub const V_OFFSET: u8 = 27;

/// A signing identity. The session signs relay challenges with it and the
/// order engine signs order hashes with it.
pub trait Signer: Send + Sync + 'static {
    /// `0x`-prefixed, lower-case hex address of this identity.
    fn address(&self) -> &str;

    /// Signs `message` as a personal message.
    fn sign_message(&self, message: &[u8]) -> Result<Signature, SigningError>;
}

pub fn keccak256(data: &[u8]) -> Keccak256Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_slice());
    output
}

/// Hash of `message` under the personal-message prefix.
pub fn hash_message(message: &[u8]) -> Keccak256Hash {
    let mut prefixed = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 20 + message.len());
    prefixed.extend(PERSONAL_MESSAGE_PREFIX.as_bytes());
    prefixed.extend(message.len().to_string().as_bytes());
    prefixed.extend(message);
    keccak256(&prefixed)
}

pub fn public_key_to_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Parses a 20-byte hex address, with or without `0x`. Exactly 40 hex
/// digits are required.
pub fn parse_address(address: &str) -> Result<AddressBytes, SigningError> {
    let digits = strip_hex_prefix(address);
    if digits.len() != 40 {
        return Err(SigningError::InvalidAddress(address.to_string()));
    }
    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes)
        .map_err(|_| SigningError::InvalidAddress(address.to_string()))?;
    Ok(bytes)
}

/// Strips a leading `0x` or `0X`.
pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// A recoverable secp256k1 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
    recovery_id: u8,
}

impl Signature {
    pub fn from_recoverable(signature: &RecoverableSignature) -> Self {
        let (recovery_id, compact) = signature.serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        Signature {
            r,
            s,
            recovery_id: recovery_id.to_i32() as u8,
        }
    }

    /// Reads `r‖s‖v` where `v` is either the raw recovery id or offset by 27.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        if bytes.len() != 65 {
            return Err(SigningError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let r: [u8; 32] = bytes[..32]
            .try_into()
            .map_err(|_| SigningError::InvalidSignature(String::from("r")))?;
        let s: [u8; 32] = bytes[32..64]
            .try_into()
            .map_err(|_| SigningError::InvalidSignature(String::from("s")))?;
        Signature::from_parts(r, s, bytes[64])
    }

    /// Rebuilds a signature from the split `r`, `s`, `v` form of a signed order.
    pub fn from_rsv(r: &str, s: &str, v: u8) -> Result<Self, SigningError> {
        let mut r_bytes = [0u8; 32];
        let mut s_bytes = [0u8; 32];
        hex::decode_to_slice(strip_hex_prefix(r), &mut r_bytes)
            .map_err(|e| SigningError::InvalidSignature(format!("r: {}", e)))?;
        hex::decode_to_slice(strip_hex_prefix(s), &mut s_bytes)
            .map_err(|e| SigningError::InvalidSignature(format!("s: {}", e)))?;
        Signature::from_parts(r_bytes, s_bytes, v)
    }

    fn from_parts(r: [u8; 32], s: [u8; 32], v: u8) -> Result<Self, SigningError> {
        let recovery_id = if v >= V_OFFSET { v - V_OFFSET } else { v };
        if recovery_id > 3 {
            return Err(SigningError::InvalidSignature(format!("bad v {}", v)));
        }
        Ok(Signature { r, s, recovery_id })
    }

    /// `r‖s‖recovery_id`, the final byte un-offset.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.recovery_id;
        bytes
    }

    pub fn r_hex(&self) -> String {
        format!("0x{}", hex::encode(self.r))
    }

    pub fn s_hex(&self) -> String {
        format!("0x{}", hex::encode(self.s))
    }

    pub fn v(&self) -> u8 {
        self.recovery_id + V_OFFSET
    }

    fn to_recoverable(&self) -> Result<RecoverableSignature, SigningError> {
        let recovery_id = RecoveryId::from_i32(self.recovery_id as i32)?;
        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&self.r);
        compact[32..].copy_from_slice(&self.s);
        Ok(RecoverableSignature::from_compact(&compact, recovery_id)?)
    }
}

impl fmt::Display for Signature {
    /// `0x` + r + s + v, the textual form wallets hand out.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{}{}{:02x}",
            hex::encode(self.r),
            hex::encode(self.s),
            self.v()
        )
    }
}

pub fn recover_address_from_hash(
    hash: &Keccak256Hash,
    signature: &Signature,
) -> Result<String, SigningError> {
    let message =
        Message::from_slice(hash).map_err(|e| SigningError::Recovery(e.to_string()))?;
    let public_key = SECP256K1
        .recover(&message, &signature.to_recoverable()?)
        .map_err(|e| SigningError::Recovery(e.to_string()))?;
    Ok(public_key_to_address(&public_key))
}

/// Address that produced `signature` over the personal message `message`.
pub fn recover_address(message: &[u8], signature: &Signature) -> Result<String, SigningError> {
    recover_address_from_hash(&hash_message(message), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hash_message() {
        assert_eq!(
            hex::encode(hash_message(b"Some data")),
            "1da44b586eb0729ff70a73c326926f6ed5a25f5b056e7f47fbc6e58d86871655"
        );
    }

    #[test]
    fn test_parse_address() {
        let bytes = parse_address("0x27054b13b1b798b345b591a4d22e6562d47ea75a").unwrap();
        assert_eq!(bytes[0], 0x27);
        assert_eq!(bytes[19], 0x5a);

        let upper = parse_address("0X27054B13B1B798B345B591A4D22E6562D47EA75A").unwrap();
        assert_eq!(upper, bytes);
        assert_eq!(
            parse_address("27054b13b1b798b345b591a4d22e6562d47ea75a").unwrap(),
            bytes
        );

        assert!(parse_address("0xA").is_err());
        assert!(parse_address("0x0").is_err());
        assert!(parse_address("0xT1").is_err());
        assert!(parse_address("0x").is_err());
        assert!(parse_address(&format!("0x{}", "g".repeat(40))).is_err());
        assert!(parse_address(&format!("0x{}", "1".repeat(41))).is_err());
    }

    #[test]
    fn test_signature_bytes_and_text() {
        let mut bytes = [0u8; 65];
        bytes[0] = 0xab;
        bytes[63] = 0xcd;
        bytes[64] = 28;
        let signature = Signature::from_bytes(&bytes).unwrap();
        assert_eq!(signature.v(), 28);
        assert_eq!(signature.to_bytes()[64], 1);
        assert!(signature.r_hex().starts_with("0xab"));
        assert!(signature.s_hex().ends_with("cd"));
        assert_eq!(signature.to_string().len(), 2 + 130);
        assert!(signature.to_string().ends_with("1c"));

        let rebuilt =
            Signature::from_rsv(&signature.r_hex(), &signature.s_hex(), signature.v()).unwrap();
        assert_eq!(rebuilt, signature);

        assert!(Signature::from_bytes(&bytes[..64]).is_err());
        bytes[64] = 40;
        assert!(Signature::from_bytes(&bytes).is_err());
    }
}
