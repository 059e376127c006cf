use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Code given to a counterparty error object that carries no usable code.
pub const UNKNOWN_ERROR_CODE: i64 = 0;

///
/// The error object of a JSON-RPC error response.
///
/// Counterparties are not held to the strict shape: a missing or
/// non-integer `code` reads as [`UNKNOWN_ERROR_CODE`], a bare string is
/// taken as the message, and `data` is kept as sent.
///
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RpcError {
    pub message: String,
    pub code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        RpcError {
            message: message.into(),
            code,
            data: None,
        }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => {
                let code = fields
                    .get("code")
                    .and_then(|code| code.as_i64().or_else(|| code.as_f64().map(|f| f as i64)))
                    .unwrap_or(UNKNOWN_ERROR_CODE);
                let message = match fields.remove("message") {
                    Some(Value::String(message)) => message,
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                RpcError {
                    message,
                    code,
                    data: fields.remove("data"),
                }
            }
            Value::String(message) => RpcError::new(message, UNKNOWN_ERROR_CODE),
            other => RpcError::new(other.to_string(), UNKNOWN_ERROR_CODE),
        }
    }
}

impl<'de> Deserialize<'de> for RpcError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(RpcError::from_value)
    }
}

///
/// A JSON-RPC 2.0 message as carried inside an envelope.
///
/// Requests carry `method` and `params`, responses carry `result` or
/// `error`. `id` correlates a response with the request it answers.
///
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RpcMessage {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

/// What an inbound message asks of the session.
#[derive(Clone, Debug, PartialEq)]
pub enum RpcKind {
    Request {
        method: String,
        params: Value,
        id: Option<u64>,
    },
    Response {
        id: u64,
        outcome: Result<Value, RpcError>,
    },
}

fn default_version() -> String {
    String::from(JSONRPC_VERSION)
}

// An explicit `null` result is still a result.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RpcMessage {
    pub fn request(method: &str, params: Value, id: u64) -> Self {
        RpcMessage {
            jsonrpc: default_version(),
            method: Some(method.to_string()),
            params: Some(params),
            result: None,
            error: None,
            id: Some(id),
        }
    }

    pub fn result(id: u64, result: Value) -> Self {
        RpcMessage {
            jsonrpc: default_version(),
            method: None,
            params: None,
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    pub fn error(id: u64, error: RpcError) -> Self {
        RpcMessage {
            jsonrpc: default_version(),
            method: None,
            params: None,
            result: None,
            error: Some(error),
            id: Some(id),
        }
    }

    /// Classifies the message. `None` for messages that are neither a
    /// request nor a correlatable response carrying `result` or `error`.
    pub fn kind(self) -> Option<RpcKind> {
        if let Some(method) = self.method {
            return Some(RpcKind::Request {
                method,
                params: self.params.unwrap_or(Value::Null),
                id: self.id,
            });
        }
        let id = self.id?;
        let outcome = match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, Some(result)) => Ok(result),
            (None, None) => return None,
        };
        Some(RpcKind::Response { id, outcome })
    }
}
