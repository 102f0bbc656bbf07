/// Replay configuration
///
/// Every field has a default, so a partial JSON document (or none at all)
/// is a valid configuration.

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("depth must be at least 1")]
    InvalidDepth,

    #[error("log_every must be at least 1")]
    InvalidLogInterval,

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Levels per side captured after each applied update
    pub depth: usize,

    /// Progress log interval, in recorded updates per book
    pub log_every: usize,

    /// Archive member prefix of snapshot files; the epoch follows as `.<timestamp>`
    pub snapshot_prefix: String,

    /// Archive member holding the diff stream
    pub depth_stream: String,

    /// Route each update to live books in parallel
    pub parallel: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            depth: 10,
            log_every: 1000,
            snapshot_prefix: "binance.BTCUSDT@orderbook5000".to_string(),
            depth_stream: "btcusdt@depth@100ms".to_string(),
            parallel: false,
        }
    }
}

impl ReplayConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ReplayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 {
            return Err(ConfigError::InvalidDepth);
        }
        if self.log_every == 0 {
            return Err(ConfigError::InvalidLogInterval);
        }
        Ok(())
    }
}
