//! Layered settings for the client binary.
//!
//! Sources, later ones winning: built-in defaults, a config file, `AIRSWAP_`
//! environment variables, and finally command-line flags applied by the
//! caller with [`config::Config::set`]. Nested keys come from the
//! environment with a double underscore, e.g. `AIRSWAP_QUOTE__MAKER_AMOUNT`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "config";
pub const ENV_PREFIX: &str = "AIRSWAP";

pub const MAINNET_RELAY_URL: &str = "wss://connect.airswap-api.com/websocket";
pub const RINKEBY_RELAY_URL: &str = "wss://sandbox.airswap-api.com/websocket";

/// AirSwap Token.
pub const AST_TOKEN: &str = "0x27054b13b1b798b345b591a4d22e6562d47ea75a";
/// Ether is traded as the zero address.
pub const ETH_TOKEN: &str = "0x0000000000000000000000000000000000000000";

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Rinkeby,
}

impl Network {
    pub fn relay_url(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_RELAY_URL,
            Network::Rinkeby => RINKEBY_RELAY_URL,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Rinkeby => write!(f, "rinkeby"),
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "rinkeby" => Ok(Network::Rinkeby),
            other => Err(ConfigError::Message(format!("unknown network `{}`", other))),
        }
    }
}

/// The fixed quote the maker handler answers `getOrder` with.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct QuoteSettings {
    pub maker_amount: String,
    pub taker_amount: String,
    pub expiration_secs: u64,
    pub maker_token: String,
    pub taker_token: String,
}

/// What the taker flow asks the indexer and makers for.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct TakerSettings {
    pub maker_tokens: Vec<String>,
    pub taker_tokens: Vec<String>,
    pub maker_amount: String,
}

#[derive(Deserialize, Clone, PartialEq)]
pub struct ClientSettings {
    pub network: Network,
    pub relay_url: Option<String>,
    pub private_key: Option<String>,
    pub quote: QuoteSettings,
    pub taker: TakerSettings,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("network", &self.network)
            .field("relay_url", &self.relay_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("quote", &self.quote)
            .field("taker", &self.taker)
            .finish()
    }
}

impl ClientSettings {
    pub fn from_config(settings: Config) -> Result<Self, ConfigError> {
        settings.try_into()
    }

    /// The explicit override if set, otherwise the network's relay.
    pub fn relay_url(&self) -> &str {
        match &self.relay_url {
            Some(url) => url,
            None => self.network.relay_url(),
        }
    }
}

pub fn defaults() -> Result<Config, ConfigError> {
    let mut settings = Config::default();
    settings
        .set_default("network", Network::Rinkeby.to_string())?
        .set_default("quote.maker_amount", "100")?
        .set_default("quote.taker_amount", "100000")?
        .set_default("quote.expiration_secs", 30i64)?
        .set_default("quote.maker_token", AST_TOKEN)?
        .set_default("quote.taker_token", ETH_TOKEN)?
        .set_default("taker.maker_tokens", vec![AST_TOKEN])?
        .set_default("taker.taker_tokens", vec![ETH_TOKEN])?
        .set_default("taker.maker_amount", "100000")?;
    Ok(settings)
}

///
/// Defaults, then the config file, then the environment.
///
/// An explicitly named file must exist; the default `config.*` is optional.
///
pub fn load(config_file: Option<&str>) -> Result<Config, ConfigError> {
    let mut settings = defaults()?;
    match config_file {
        Some(name) => settings.merge(File::with_name(name))?,
        None => settings.merge(File::with_name(DEFAULT_CONFIG_FILE).required(false))?,
    };
    settings.merge(Environment::with_prefix(ENV_PREFIX).separator("__"))?;
    Ok(settings)
}

/// Applies a `--network` flag. Any letter case names a network.
pub fn set_network(settings: &mut Config, name: &str) -> Result<(), ConfigError> {
    let network: Network = name.parse()?;
    settings.set("network", network.to_string())?;
    Ok(())
}
