//! Default locations for configuration and caches
//!
//! Uses the platform's standard directories (XDG on Linux, Application
//! Support on macOS, AppData on Windows) with a `rocketblend` subdirectory.
//! Each location can be overridden through an environment variable.

use std::path::PathBuf;

use crate::error::{Result, RocketError};

const APP_DIR: &str = "rocketblend";

/// Configuration file name inside the config directory
pub const CONFIG_FILE: &str = "config.yaml";

pub const CONFIG_DIR_ENV: &str = "ROCKETBLEND_CONFIG_DIR";
pub const PACKAGES_PATH_ENV: &str = "ROCKETBLEND_PACKAGES_PATH";
pub const INSTALLATIONS_PATH_ENV: &str = "ROCKETBLEND_INSTALLATIONS_PATH";

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| RocketError::ConfigInvalid {
        message: "Could not determine data directory".to_string(),
    })?;
    Ok(base.join(APP_DIR))
}

/// Directory holding `config.yaml`
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = env_path(CONFIG_DIR_ENV) {
        return Ok(dir);
    }
    let base = dirs::config_dir().ok_or_else(|| RocketError::ConfigInvalid {
        message: "Could not determine config directory".to_string(),
    })?;
    Ok(base.join(APP_DIR))
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Where registry clones live
pub fn default_packages_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("packages"))
}

/// Where installations live
pub fn default_installations_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("installations"))
}

pub(super) fn packages_path_override() -> Option<PathBuf> {
    env_path(PACKAGES_PATH_ENV)
}

pub(super) fn installations_path_override() -> Option<PathBuf> {
    env_path(INSTALLATIONS_PATH_ENV)
}
