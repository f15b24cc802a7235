//! Configuration file handling.
//!
//! Looks for `.config/purlin.toml` in the current directory or any parent
//! directory. Everything in it is a default for the matching command-line
//! flag; flags win.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Defaults read from `.config/purlin.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bulk_change: bool,
    pub default_int_limit: Option<u32>,
    pub dump_with_default_fk_name: bool,
    pub dialect: Option<String>,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Load configuration, searching up the directory tree from the CWD.
/// No file found is not an error; defaults apply.
pub fn load() -> Result<Config, ConfigError> {
    let Ok(cwd) = std::env::current_dir() else {
        return Ok(Config::default());
    };
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Path) -> Result<Config, ConfigError> {
    let Some(config_path) = find_config_file(start) else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
        path: config_path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: config_path.display().to_string(),
        message: e.to_string(),
    })
}

/// Find `.config/purlin.toml` by searching up the directory tree.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let config_path = current.join(".config/purlin.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}
