use std::{
    env, fs,
    path::PathBuf,
    sync::{LazyLock, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Registry configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Directory used for scratch space while building artifacts.
    /// Default: the system temp directory.
    pub tmp_dir: Option<String>,

    /// Maximum size of a compressed package artifact, in bytes.
    /// Default: 1000000
    pub max_tarball_size: u64,

    /// Path to the SQLite registry database.
    /// Default: horus.db in the current directory.
    pub db_path: Option<String>,

    /// If true, repository URLs are stored exactly as supplied.
    /// Default: false
    pub skip_url_normalization: bool,

    /// If true, the remote-listing probe of repository URLs is skipped.
    /// Default: false
    pub skip_url_validation: bool,

    /// Hard timeout for the remote-listing probe, in seconds.
    /// Default: 10
    pub url_probe_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmp_dir: None,
            max_tarball_size: 1_000_000,
            db_path: None,
            skip_url_normalization: false,
            skip_url_validation: false,
            url_probe_timeout: 10,
        }
    }
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match env::var("HORUS_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => PathBuf::from("config.toml"),
    })
});

/// Loads the configuration file and installs it as the process-wide config.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap();
    *global_config = Some(config);
    Ok(())
}

fn ensure_config_initialized() {
    let mut config_guard = CONFIG.write().unwrap();
    if config_guard.is_none() {
        *config_guard = Some(Config::default());
    }
}

/// Returns a clone of the current configuration, falling back to defaults
/// when no config file has been loaded.
pub fn get_config() -> Config {
    {
        let config_guard = CONFIG.read().unwrap();
        if let Some(config) = config_guard.as_ref() {
            return config.clone();
        }
    }

    ensure_config_initialized();

    CONFIG.read().unwrap().as_ref().unwrap().clone()
}

impl Config {
    /// Reads the configuration from [`CONFIG_PATH`], using defaults when the
    /// file does not exist.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH.read().unwrap().clone();

        if !config_path.exists() {
            debug!("no config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|err| ConfigError::IoError {
            action: "reading config file",
            source: err,
        })?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolved scratch directory for artifact builds.
    pub fn tmp_dir(&self) -> PathBuf {
        self.tmp_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir)
    }

    /// Resolved path of the registry database.
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("horus.db"))
    }
}

/// Writes a default config file at [`CONFIG_PATH`].
pub fn generate_default_config() -> Result<()> {
    let config_path = CONFIG_PATH.read().unwrap().clone();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            horus_utils::fs::ensure_dir_exists(parent)
                .map_err(|err| ConfigError::IoError {
                    action: "creating config directory",
                    source: std::io::Error::other(err.to_string()),
                })?;
        }
    }

    let serialized = toml::to_string_pretty(&Config::default())?;
    fs::write(&config_path, serialized).map_err(|err| ConfigError::IoError {
        action: "writing config file",
        source: err,
    })?;

    Ok(())
}
