//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, ExperimentConfig, ValidateArgs};
use mtedl_common::Result;

/// Episode shape as a one-line summary
pub fn format_task_info(config: &ExperimentConfig) -> String {
    format!(
        "  {}-way {}-shot, queries train/val/test {}/{}/{}",
        config.way, config.shot, config.train_query, config.val_query, config.query
    )
}

/// Optimization settings of the configured phase
pub fn format_optimization_info(config: &ExperimentConfig) -> String {
    format!(
        "  loss {} ({} evidence), meta lr {}/{}, inner lr {}/{} x {} steps, decay {} every {} epochs",
        config.loss_type,
        config.evidence,
        config.meta_lr1,
        config.meta_lr2,
        config.meta_base_lr,
        config.pre_base_lr,
        config.update_step,
        config.gamma,
        config.step_size,
    )
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<()> {
    let config = load_config(&args.config)?;

    log(
        level,
        LogLevel::Normal,
        &format!("Configuration valid: {}", args.config.display()),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  {} on {}", config.phase, config.dataset),
    );
    log(level, LogLevel::Normal, &format_task_info(&config));
    log(level, LogLevel::Verbose, &format_optimization_info(&config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_task_info() {
        let config = ExperimentConfig {
            way: 5,
            shot: 5,
            ..ExperimentConfig::default()
        };
        assert_eq!(
            format_task_info(&config),
            "  5-way 5-shot, queries train/val/test 15/15/15"
        );
    }

    #[test]
    fn test_format_optimization_info_mentions_loss() {
        let text = format_optimization_info(&ExperimentConfig::default());
        assert!(text.contains("loss log"));
        assert!(text.contains("100 steps"));
    }
}
