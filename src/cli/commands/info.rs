//! Info command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{read_config, InfoArgs, OutputFormat};
use mtedl_common::{MtedlError, Result};

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<()> {
    let config = read_config(&args.config)?;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Configuration Info:");
            println!();
            println!("Phase: {}", config.phase);
            println!("Dataset: {} ({})", config.dataset, config.data_root.display());
            println!(
                "Task: {}-way {}-shot, {} test tasks",
                config.way, config.shot, config.task_num
            );
            println!("Loss: {} with {} evidence", config.loss_type, config.evidence);
            println!(
                "Encoder: {} {:?} -> {}",
                config.model_type, config.encoder.hidden, config.encoder.embedding_dim
            );
            println!("Meta save dir: {}", config.meta_save_dir().display());
            println!("Pretrain save dir: {}", config.pre_save_dir().display());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| MtedlError::serialization(format!("JSON serialization error: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| MtedlError::serialization(format!("YAML serialization error: {e}")))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
