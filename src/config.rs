use crate::core::{Result, SqlFrameError};
use crate::core::db::IfExists;
use crate::dialect::Dialect;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub query: QueryConfig,
    pub write: WriteConfig,
}

/// Query-related configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Retry once when a commit fails with an operational error
    pub retry: bool,
    /// Convert numeric-looking text to floats in `read_frame`
    pub coerce_float: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            retry: true,
            coerce_float: true,
        }
    }
}

/// Defaults for `write_frame`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    pub flavor: Dialect,
    pub if_exists: IfExists,
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = sqlframe::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        SqlFrameError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
    })?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| SqlFrameError::Config(e.to_string()))
}

/// `<config dir>/sqlframe/config.toml`, when the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sqlframe").join("config.toml"))
}
