//! mtedl CLI
//!
//! # Usage
//!
//! ```bash
//! # Pretrain the encoder, then meta-train on top of it
//! mtedl run config.yaml --phase pre_train
//! mtedl run config.yaml --phase meta_train
//!
//! # Evaluate the best meta-trained checkpoint
//! mtedl run config.yaml --phase meta_eval
//! mtedl run config.yaml --phase OOD_test
//! mtedl run config.yaml --phase threshold_test
//!
//! # Validate config
//! mtedl validate config.yaml
//!
//! # Show config info
//! mtedl info config.yaml --format yaml
//! ```

use clap::Parser;
use mtedl::cli::{init_logging, run_command, Cli, LogLevel};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}
