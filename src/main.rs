//! RocketBlend - package manager for Blender builds and addons

use clap::Parser;

use rocketblend::cli::Cli;
use rocketblend::config::Config;
use rocketblend::{commands, logging};

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let filter = if cli.verbose {
        "rocketblend=debug"
    } else {
        config.log_level.as_str()
    };
    logging::init_logging(Some(filter));

    commands::run(cli.project, cli.command, &config)?;
    Ok(())
}
