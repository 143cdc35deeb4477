use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug)]
pub struct ChanConfig {
    /// Directory the channel block files live in.
    #[serde(default = "defaults::shm_dir")]
    pub shm_dir: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Ceiling on live channels.
    #[serde(default = "defaults::max_channels")]
    pub max_channels: usize,
    /// Slot-count ceiling create requests are clamped against.
    #[serde(default = "defaults::max_capacity")]
    pub max_capacity: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn shm_dir() -> String {
        "/tmp".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn max_channels() -> usize {
        16
    }

    pub fn max_capacity() -> u32 {
        1024
    }
}

impl Default for ChanConfig {
    fn default() -> Self {
        Self {
            shm_dir: defaults::shm_dir(),
            log_level: defaults::log_level(),
            max_channels: defaults::max_channels(),
            max_capacity: defaults::max_capacity(),
        }
    }
}

impl ChanConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: ChanConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}
