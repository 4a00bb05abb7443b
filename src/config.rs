use crate::error::Result;
use serde::Deserialize;
use std::fs;
use tracing::debug;

const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_seconds: 30,
            user_agent: concat!("farmergo/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to the
    /// defaults when the file does not exist. A file that exists but does not
    /// parse is an error, not a silent fallback.
    pub fn load() -> Result<Self> {
        match fs::read_to_string(CONFIG_PATH) {
            Ok(contents) => {
                let config: Config = toml::from_str(&contents)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no {} found, using defaults", CONFIG_PATH);
                Ok(Config::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
