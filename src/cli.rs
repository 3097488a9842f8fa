//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RocketBlend - package manager for Blender builds and addons
#[derive(Parser, Debug)]
#[command(
    name = "rocketblend",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Package manager for Blender builds and addons",
    long_about = "RocketBlend pins the Blender build and addons a project uses in \
                  .rocketblend/profile.json, resolves them from git-hosted package \
                  registries and installs them into a shared local cache.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  rocketblend new\n    \
                  rocketblend install addons/cycles\n    \
                  rocketblend uninstall addons/cycles\n    \
                  rocketblend tidy --update\n    \
                  rocketblend resolve"
)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(long, short = 'p', global = true)]
    pub project: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add packages to the project and install everything it needs
    Install(InstallArgs),

    /// Remove packages from the project
    Uninstall(UninstallArgs),

    /// Rewrite the profile with resolved, typed dependencies
    Tidy(TidyArgs),

    /// Print the installed paths of the project's dependencies as JSON
    Resolve,

    /// Create a profile for a new project
    New(NewArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Install everything in the profile:\n    rocketblend install\n\n\
                   Add and install an addon:\n    rocketblend install addons/cycles\n\n\
                   Switch build using an alias:\n    rocketblend install builds/blender/4.2.2")]
pub struct InstallArgs {
    /// Package references to add. If not provided, installs the profile as is
    #[arg(value_name = "REFERENCE")]
    pub references: Vec<String>,
}

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Remove an addon:\n    rocketblend uninstall addons/cycles")]
pub struct UninstallArgs {
    /// Package references to remove
    #[arg(value_name = "REFERENCE", required = true)]
    pub references: Vec<String>,
}

/// Arguments for the tidy command
#[derive(Parser, Debug)]
pub struct TidyArgs {
    /// Pull the package registries before resolving
    #[arg(long)]
    pub update: bool,
}

/// Arguments for the new command
#[derive(Parser, Debug)]
pub struct NewArgs {
    /// Overwrite an existing profile
    #[arg(long, short = 'f')]
    pub force: bool,
}
