use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the trade the publisher of an intent takes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Maker,
    Taker,
}

impl Default for Role {
    fn default() -> Self {
        Role::Maker
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Maker => write!(f, "maker"),
            Role::Taker => write!(f, "taker"),
        }
    }
}

///
/// A standing declaration of willingness to trade a token pair.
///
/// The indexer fills in `address` when serving intents. Intents published
/// through `setIntents` leave it out; the indexer takes the publisher's
/// address from the request instead.
///
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub maker_token: String,
    pub taker_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Intent {
    pub fn new(maker_token: &str, taker_token: &str, role: Role) -> Self {
        Intent {
            address: None,
            maker_token: maker_token.to_string(),
            taker_token: taker_token.to_string(),
            role: Some(role),
        }
    }
}
