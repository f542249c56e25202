use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Default configuration file, looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Deploy.toml";

/// `IC_ENV` value that selects the local replica.
const LOCAL_ENV: &str = "local";

/// `NODE_ENV` value that disables root key fetching.
const PRODUCTION_ENV: &str = "production";

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
#[cfg(feature = "logging")]
fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
        }
    }
}

/// Network endpoints.
#[derive(Deserialize)]
pub struct Network {
    /// Local replica URL.
    #[serde(default = "default_local_url")]
    pub local_url: String,

    /// Public boundary node URL.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Host and port of the local HTTP gateway, used to print canister URLs.
    #[serde(default = "default_local_gateway")]
    pub local_gateway: String,

    /// Effective canister id used when provisioning a new canister.
    ///
    /// Some replicas reject provisional creation routed through the management
    /// canister and require an id from their own range instead.
    #[serde(default)]
    pub provisional_effective_canister_id: Option<String>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            local_url: default_local_url(),
            public_url: default_public_url(),
            local_gateway: default_local_gateway(),
            provisional_effective_canister_id: None,
        }
    }
}

fn default_local_url() -> String {
    String::from("http://127.0.0.1:4943")
}

fn default_public_url() -> String {
    String::from("https://ic0.app")
}

fn default_local_gateway() -> String {
    String::from("localhost:4943")
}

/// General configuration.
#[derive(Deserialize, Default)]
pub struct Config {
    /// Logging configuration.
    #[cfg(feature = "logging")]
    #[serde(default)]
    pub logging: Logging,

    /// Network configuration.
    #[serde(default)]
    pub network: Network,

    /// Target network selector, read from `IC_ENV`.
    #[serde(default)]
    pub ic_env: Option<String>,

    /// Runtime environment, read from `NODE_ENV`.
    #[serde(default)]
    pub node_env: Option<String>,
}

impl Config {
    /// Create new config using a configuration file and environment variables.
    ///
    /// Values are layered in the following order, later sources taking precedence:
    /// the TOML file (`Deploy.toml` unless `path` is provided), `DEPLOY__`-prefixed
    /// variables with `__` as the nesting separator, and the raw `IC_ENV` and
    /// `NODE_ENV` variables.
    pub fn new(path: Option<PathBuf>) -> Result<Self, figment::Error> {
        Self::figment(path.as_deref()).extract()
    }

    /// Layered configuration sources shared by every configuration section.
    pub fn figment(path: Option<&Path>) -> Figment {
        Figment::new()
            .merge(Toml::file(path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE))))
            .merge(Env::prefixed("DEPLOY__").split("__"))
            .merge(Env::raw().only(&["IC_ENV", "NODE_ENV"]))
    }

    /// Whether the local replica was selected.
    pub fn is_local(&self) -> bool {
        self.ic_env.as_deref() == Some(LOCAL_ENV)
    }

    /// Replica URL the agent connects to.
    pub fn host(&self) -> &str {
        if self.is_local() {
            &self.network.local_url
        } else {
            &self.network.public_url
        }
    }

    /// Whether the network root key must be fetched before making calls.
    ///
    /// Local and test networks use self-signed trust roots, so the key is fetched
    /// everywhere except in production.
    pub fn should_fetch_root_key(&self) -> bool {
        self.node_env.as_deref() != Some(PRODUCTION_ENV)
    }
}
