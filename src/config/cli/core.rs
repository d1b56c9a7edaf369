//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::types::OutputFormat;
use crate::config::{DatasetKind, ExperimentConfig, Phase};
use crate::edl::EdlLossType;
use crate::model::EvidenceActivation;

/// mtedl: evidential meta-transfer learning for few-shot classification
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "mtedl")]
#[command(version)]
#[command(
    about = "Meta-transfer learning with evidential heads: pretraining, meta-training, evaluation and OOD detection"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the configured phase
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display the resolved configuration
    Info(InfoArgs),
}

/// Arguments for the run command
///
/// Every option overrides the corresponding key of the YAML file.
#[derive(Parser, Debug, Clone, PartialEq, Default)]
pub struct RunArgs {
    /// Path to YAML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub phase: Option<Phase>,

    #[arg(long)]
    pub dataset: Option<DatasetKind>,

    #[arg(long)]
    pub way: Option<usize>,

    #[arg(long)]
    pub shot: Option<usize>,

    #[arg(long)]
    pub query: Option<usize>,

    #[arg(long)]
    pub train_query: Option<usize>,

    #[arg(long)]
    pub val_query: Option<usize>,

    #[arg(long)]
    pub train_num_batch: Option<usize>,

    #[arg(long)]
    pub val_num_batch: Option<usize>,

    /// Number of test tasks
    #[arg(long)]
    pub task_num: Option<usize>,

    #[arg(long)]
    pub loss_type: Option<EdlLossType>,

    #[arg(long)]
    pub evidence: Option<EvidenceActivation>,

    #[arg(long)]
    pub meta_lr1: Option<f32>,

    #[arg(long)]
    pub meta_lr2: Option<f32>,

    #[arg(long)]
    pub meta_base_lr: Option<f32>,

    #[arg(long)]
    pub pre_base_lr: Option<f32>,

    #[arg(long)]
    pub base_lr: Option<f32>,

    #[arg(long)]
    pub update_step: Option<usize>,

    #[arg(long)]
    pub step_size: Option<usize>,

    #[arg(long)]
    pub gamma: Option<f32>,

    #[arg(long)]
    pub max_epoch: Option<usize>,

    #[arg(long)]
    pub pretrain_evidence_weight: Option<f32>,

    /// Random seed, 0 for a nondeterministic run
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub gpu: Option<String>,

    #[arg(long)]
    pub data_root: Option<PathBuf>,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[arg(long)]
    pub pretrain_checkpoint: Option<PathBuf>,

    #[arg(long)]
    pub meta_checkpoint: Option<PathBuf>,

    /// Validate and print the configuration without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

macro_rules! override_fields {
    ($config:expr, $args:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = &$args.$field {
                $config.$field = value.clone();
            }
        )*
    };
}

/// Apply command-line overrides to an ExperimentConfig
pub fn apply_overrides(config: &mut ExperimentConfig, args: &RunArgs) {
    override_fields!(
        config,
        args,
        [
            phase,
            dataset,
            way,
            shot,
            query,
            train_query,
            val_query,
            train_num_batch,
            val_num_batch,
            task_num,
            loss_type,
            evidence,
            meta_lr1,
            meta_lr2,
            meta_base_lr,
            pre_base_lr,
            base_lr,
            update_step,
            step_size,
            gamma,
            max_epoch,
            pretrain_evidence_weight,
            seed,
            gpu,
            data_root,
            log_dir,
        ]
    );
    if let Some(path) = &args.pretrain_checkpoint {
        config.pretrain_checkpoint = Some(path.clone());
    }
    if let Some(path) = &args.meta_checkpoint {
        config.meta_checkpoint = Some(path.clone());
    }
}
