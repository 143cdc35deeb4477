mod config;

pub use config::{ChanConfig, ConfigError};
