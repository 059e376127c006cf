use crate::crypto::Signer;
use crate::error::SigningError;
use std::fmt;

/// Frame the relay sends once it accepts our challenge response.
pub const AUTH_OK: &str = "ok";
/// Frame the relay sends when our address may not connect.
pub const AUTH_NOT_AUTHORIZED: &str = "not authorized";

/// Where a connection stands with the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Disconnected,
    AwaitingChallenge,
    Authenticated,
    Rejected,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::Disconnected => "disconnected",
            AuthState::AwaitingChallenge => "awaiting challenge",
            AuthState::Authenticated => "authenticated",
            AuthState::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// What the session must do after a pre-authentication frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthStep {
    Authenticated,
    Rejected,
    /// Send this signed challenge back as a raw frame.
    Respond(String),
    /// The machine is no longer awaiting a challenge.
    Ignored,
}

///
/// Challenge/response handshake with the relay.
///
/// A new connection starts out awaiting a challenge. Every frame is
/// consumed here until the relay answers `ok` or `not authorized`; any
/// other frame is a challenge, signed and echoed back unwrapped. Both
/// answers are final for the connection.
///
#[derive(Debug)]
pub struct Authenticator {
    state: AuthState,
}

impl Default for Authenticator {
    fn default() -> Self {
        Authenticator::new()
    }
}

impl Authenticator {
    pub fn new() -> Self {
        Authenticator {
            state: AuthState::AwaitingChallenge,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn handle_frame(
        &mut self,
        frame: &str,
        signer: &dyn Signer,
    ) -> Result<AuthStep, SigningError> {
        if self.state != AuthState::AwaitingChallenge {
            return Ok(AuthStep::Ignored);
        }
        match frame {
            AUTH_OK => {
                self.state = AuthState::Authenticated;
                Ok(AuthStep::Authenticated)
            }
            AUTH_NOT_AUTHORIZED => {
                self.state = AuthState::Rejected;
                Ok(AuthStep::Rejected)
            }
            challenge => {
                let signature = signer.sign_message(challenge.as_bytes())?;
                Ok(AuthStep::Respond(signature.to_string()))
            }
        }
    }

    /// The connection is gone.
    pub fn reset(&mut self) {
        self.state = AuthState::Disconnected;
    }
}
