//! Command implementations for the RocketBlend CLI
//!
//! Each command loads the project profile through the driver, applies its
//! change, and writes the profile back.

pub mod install;
pub mod new;
pub mod resolve;
pub mod tidy;
pub mod uninstall;

use std::path::PathBuf;

use console::Style;
use tokio_util::sync::CancellationToken;

use crate::cli::Commands;
use crate::config::Config;
use crate::driver::{ProfileEntry, SaveOptions};
use crate::error::{Result, RocketError};
use crate::reference::Reference;
use crate::services::Services;

/// What every command works with
pub struct Context {
    pub project: PathBuf,
    pub services: Services,
    pub token: CancellationToken,
}

impl Context {
    pub fn new(project: Option<PathBuf>, config: &Config) -> Result<Self> {
        Ok(Self {
            project: resolve_project_path(project)?,
            services: Services::from_config(config)?,
            token: CancellationToken::new(),
        })
    }

    /// The project's profile, which must exist
    pub fn load(&self) -> Result<Vec<ProfileEntry>> {
        self.services
            .driver
            .load_profiles(&self.token, std::slice::from_ref(&self.project), None)
    }

    /// Write back profiles loaded through [`Context::load`]
    pub fn save(&self, entries: &[ProfileEntry]) -> Result<()> {
        self.services.driver.save_profiles(
            &self.token,
            entries,
            SaveOptions {
                ensure_paths: false,
                overwrite: true,
            },
        )
    }

    /// Parse user input, expanding aliases
    pub fn references(&self, inputs: &[String]) -> Result<Vec<Reference>> {
        inputs
            .iter()
            .map(|input| self.services.config.aliases.resolve(input))
            .collect()
    }
}

/// Dispatch a parsed command
pub fn run(project: Option<PathBuf>, command: Commands, config: &Config) -> Result<()> {
    let context = Context::new(project, config)?;
    match command {
        Commands::Install(args) => install::run(&context, &args),
        Commands::Uninstall(args) => uninstall::run(&context, &args),
        Commands::Tidy(args) => tidy::run(&context, &args),
        Commands::Resolve => resolve::run(&context),
        Commands::New(args) => new::run(&context, &args),
    }
}

fn resolve_project_path(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(path) => Ok(path),
        None => std::env::current_dir().map_err(|e| RocketError::IoError {
            message: format!("Failed to get current directory: {e}"),
        }),
    }
}

pub(crate) fn success(message: &str) {
    let style = Style::new().green().bold();
    eprintln!("{} {message}", style.apply_to("✓"));
}
