//! User configuration (`config.yaml`)
//!
//! ```yaml
//! platform: linux
//! packagesPath: /home/me/.local/share/rocketblend/packages
//! installationsPath: /home/me/.local/share/rocketblend/installations
//! defaultBuild: github.com/rocketblend/official-library/packages/v0/builds/blender/4.2.2
//! executionMode: bounded
//! maxConcurrency: 5
//! logLevel: info
//! aliases:
//!   builds: github.com/rocketblend/official-library/packages/v0/builds
//! ```
//!
//! Every field is optional; a missing file yields the defaults.

pub mod paths;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RocketError, fs as fs_err};
use crate::platform::{self, Platform};
use crate::reference::{AliasTable, Reference};
use crate::task::{DEFAULT_MAX_CONCURRENCY, ExecutionMode, RunOptions};

/// Root of the official package library
pub const OFFICIAL_LIBRARY: &str = "github.com/rocketblend/official-library/packages/v0";

/// Build used for new projects unless configured otherwise
pub const DEFAULT_BUILD: &str =
    "github.com/rocketblend/official-library/packages/v0/builds/blender/4.2.2";

/// Aliases shipped with the default configuration
pub fn default_aliases() -> AliasTable {
    [
        ("builds", format!("{OFFICIAL_LIBRARY}/builds")),
        ("addons", format!("{OFFICIAL_LIBRARY}/addons")),
        ("blender", format!("{OFFICIAL_LIBRARY}/builds/blender")),
    ]
    .into_iter()
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub platform: Platform,
    pub packages_path: PathBuf,
    pub installations_path: PathBuf,
    pub aliases: AliasTable,
    pub default_build: String,
    pub execution_mode: ExecutionMode,
    pub max_concurrency: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: platform::current(),
            packages_path: paths::default_packages_path().unwrap_or_default(),
            installations_path: paths::default_installations_path().unwrap_or_default(),
            aliases: default_aliases(),
            default_build: DEFAULT_BUILD.to_string(),
            execution_mode: ExecutionMode::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load from the default location, applying environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_file()?)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file gives the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(fs_err::read_failed(path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| RocketError::ConfigParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_err::write_failed(parent, e))?;
        }
        fs::write(path, serde_yaml::to_string(self)?).map_err(|e| fs_err::write_failed(path, e))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(path) = paths::packages_path_override() {
            self.packages_path = path;
        }
        if let Some(path) = paths::installations_path_override() {
            self.installations_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(RocketError::ConfigInvalid { message });

        if !self.platform.is_supported() {
            return invalid(format!("platform '{}' is not supported", self.platform));
        }
        if self.packages_path.as_os_str().is_empty() {
            return invalid("packagesPath is empty".to_string());
        }
        if self.installations_path.as_os_str().is_empty() {
            return invalid("installationsPath is empty".to_string());
        }
        if self.execution_mode.is_limited() && self.max_concurrency == 0 {
            return invalid(format!(
                "maxConcurrency must be at least 1 for {} mode",
                self.execution_mode
            ));
        }
        for (alias, canonical) in self.aliases.iter() {
            if alias.is_empty() || alias.split('/').any(str::is_empty) {
                return invalid(format!("alias '{alias}' is malformed"));
            }
            if canonical.trim_end_matches('/').split('/').count() < 3 {
                return invalid(format!(
                    "alias '{alias}' must point at <host>/<org>/<repo>[/...], got '{canonical}'"
                ));
            }
        }
        self.default_build()?;
        Ok(())
    }

    /// The default build as a reference, with aliases applied
    pub fn default_build(&self) -> Result<Reference> {
        self.aliases.resolve(&self.default_build)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions::new(self.execution_mode, self.max_concurrency)
    }
}
