//! CLI command implementations

mod info;
mod run;
mod validate;

pub use run::run_phase;

use crate::cli::LogLevel;
use crate::config::{Cli, Command};
use mtedl_common::Result;

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<()> {
    let log_level = LogLevel::from_flags(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => run::run_run(args, log_level),
        Command::Validate(args) => validate::run_validate(args, log_level),
        Command::Info(args) => info::run_info(args, log_level),
    }
}
