//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! mtedl run config.yaml
//! mtedl run config.yaml --phase OOD_test --shot 5
//! mtedl validate config.yaml
//! mtedl info config.yaml --format json
//! ```

mod core;
mod types;

#[cfg(test)]
mod tests;

pub use core::{apply_overrides, parse_args, Cli, Command, InfoArgs, RunArgs, ValidateArgs};
pub use types::OutputFormat;
