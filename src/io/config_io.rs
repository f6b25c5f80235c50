use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Default config file location, respecting XDG_CONFIG_HOME
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".config"));
    config_dir.join("todoodle").join("config.toml")
}

/// Default data directory, respecting XDG_DATA_HOME
pub fn default_data_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".local").join("share"));
    data_dir.join("todoodle")
}

/// Get the user's home directory
fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read config from a specific path. A missing file yields the defaults.
pub fn read_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    Ok(toml::from_str(&text)?)
}

/// Read config from the default location.
pub fn read_config() -> Result<Config, ConfigError> {
    read_config_from(&config_path())
}

/// The directory the store lives in: explicit override, then config, then
/// the platform default.
pub fn resolve_data_dir(config: &Config, override_dir: Option<&Path>) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .or_else(|| config.store.data_dir.clone())
        .unwrap_or_else(default_data_dir)
}
