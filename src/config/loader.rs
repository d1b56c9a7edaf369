//! Load experiment configuration from YAML

use super::schema::ExperimentConfig;
use super::validate::validate_config;
use mtedl_common::{MtedlError, Result};
use std::fs;
use std::path::Path;

/// Read, parse and validate a configuration file
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<ExperimentConfig> {
    let config = read_config(config_path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Read and parse without validating, so CLI overrides can still fix values
pub fn read_config<P: AsRef<Path>>(config_path: P) -> Result<ExperimentConfig> {
    let path = config_path.as_ref();
    let yaml_content = fs::read_to_string(path)
        .map_err(|e| MtedlError::io(format!("Failed to read config file {}", path.display()), e))?;
    ExperimentConfig::from_yaml_str(&yaml_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetKind, Phase};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_yaml(
            r"
dataset: FC100
phase: meta_eval
way: 5
shot: 5
task_num: 100
",
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.dataset, DatasetKind::Fc100);
        assert_eq!(config.phase, Phase::MetaEval);
        assert_eq!(config.task_num, 100);
    }

    #[test]
    fn test_load_invalid_config_is_configuration_error() {
        let file = write_yaml("way: 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, MtedlError::Configuration { .. }));
        assert!(read_config(file.path()).is_ok());
    }

    #[test]
    fn test_load_malformed_yaml() {
        let file = write_yaml("way: [unclosed\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, MtedlError::Serialization { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, MtedlError::Io { .. }));
    }
}
