use crate::error::ParseError;
use crate::networking::rpc::RpcMessage;
use crate::time::create_timestamp;
use serde::{Deserialize, Serialize};

/// The outer wrapper of every post-authentication frame. `message` holds a
/// serialized [`RpcMessage`]; `id` is transport-level and unrelated to the
/// inner correlation id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Envelope {
    pub sender: String,
    pub receiver: String,
    pub message: String,
    pub id: u64,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    sender: String,
    #[serde(default)]
    receiver: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    id: Option<u64>,
}

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub id: Option<u64>,
    pub sender: String,
    pub receiver: String,
    pub message: RpcMessage,
}

///
/// Ids derived from the wall clock in milliseconds, bumped past the last
/// id handed out so two ids from one source never repeat.
///
#[derive(Debug, Default)]
pub struct IdSource {
    last: u64,
}

impl IdSource {
    pub fn new() -> Self {
        IdSource { last: 0 }
    }

    pub fn next_id(&mut self) -> u64 {
        self.last = create_timestamp().max(self.last + 1);
        self.last
    }
}

/// Frames inner messages for the wire on behalf of one local address.
#[derive(Debug)]
pub struct Codec {
    local_address: String,
    ids: IdSource,
}

impl Codec {
    pub fn new(local_address: &str) -> Self {
        Codec {
            local_address: local_address.to_lowercase(),
            ids: IdSource::new(),
        }
    }

    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    pub fn ids(&mut self) -> &mut IdSource {
        &mut self.ids
    }

    pub fn encode(&mut self, receiver: &str, message: &RpcMessage) -> serde_json::Result<String> {
        let envelope = Envelope {
            sender: self.local_address.clone(),
            receiver: receiver.to_string(),
            message: serde_json::to_string(message)?,
            id: self.ids.next_id(),
        };
        serde_json::to_string(&envelope)
    }

    /// Parses the envelope, then the message it carries.
    pub fn decode(frame: &str) -> Result<Decoded, ParseError> {
        let raw: RawEnvelope = serde_json::from_str(frame).map_err(ParseError::Envelope)?;
        let inner = raw.message.ok_or(ParseError::MissingMessage)?;
        let message: RpcMessage = serde_json::from_str(&inner).map_err(ParseError::Message)?;
        Ok(Decoded {
            id: raw.id,
            sender: raw.sender,
            receiver: raw.receiver,
            message,
        })
    }
}
