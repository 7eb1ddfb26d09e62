//! Command Line Interface module
//!
//! Argument parsing and the command implementations.

pub mod args;
pub mod commands;

pub use args::*;

use anyhow::Result;

use crate::config::HarnessConfig;
use crate::utils::logging::init_cli_logging;

/// Main CLI application runner
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_cli_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let config = HarnessConfig::load(cli.config.as_deref())?;
    commands::execute_command(cli.command.clone(), &config).await
}
