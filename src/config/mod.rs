//! Declarative experiment configuration
//!
//! A YAML file (see [`ExperimentConfig`]) selects the dataset, phase and
//! hyperparameters; the CLI may override any of them before validation.

pub mod cli;
mod loader;
mod schema;
mod validate;

pub use cli::{apply_overrides, parse_args, Cli, Command, InfoArgs, OutputFormat, RunArgs, ValidateArgs};
pub use loader::{load_config, read_config};
pub use schema::{DatasetKind, EncoderConfig, ExperimentConfig, Phase, OOD_DATASET_DIR};
pub use validate::{validate_config, ValidationError};
