//! Configuration handling for the horus package registry.

pub mod config;
pub mod error;
#[cfg(test)]
pub mod test_utils;

pub use config::{get_config, init, Config, CONFIG_PATH};
pub use error::{ConfigError, Result};
