//! Checkpoint loading

use super::model::Checkpoint;
use crate::nn::StateDict;
use mtedl_common::{MtedlError, Result};
use std::fs;
use std::path::Path;

/// Read a checkpoint file
pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<Checkpoint> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| MtedlError::io(format!("reading checkpoint {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| {
        MtedlError::serialization(format!(
            "JSON deserialization of {} failed: {e}",
            path.display()
        ))
    })
}

/// Read a checkpoint file straight into a parameter mapping
pub fn load_state_dict(path: impl AsRef<Path>) -> Result<StateDict> {
    load_checkpoint(path)?.to_state()
}

/// Rename `source` keys to `prefix + key`, keeping only those the target has
///
/// Used to load an encoder-only pretrain checkpoint into a larger model: keys
/// the target model does not define are dropped silently.
pub fn filter_with_prefix(source: &StateDict, prefix: &str, target: &StateDict) -> StateDict {
    source
        .iter()
        .map(|(key, value)| (format!("{prefix}{key}"), value))
        .filter(|(key, _)| target.contains_key(key))
        .map(|(key, value)| (key, value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::save_checkpoint;
    use ndarray::{arr2, Array2};
    use tempfile::TempDir;

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("epoch20.json");
        let mut state = StateDict::new();
        state.insert("meta_base_learner.weight".into(), arr2(&[[1.0, -2.0], [0.5, 3.25]]));
        save_checkpoint(&state, &path).unwrap();

        assert_eq!(load_state_dict(&path).unwrap(), state);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_checkpoint("/nonexistent/max_acc.json").unwrap_err();
        assert!(matches!(err, MtedlError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_json_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_checkpoint(&path).unwrap_err();
        assert!(matches!(err, MtedlError::Serialization { .. }));
    }

    #[test]
    fn test_filter_keeps_only_target_keys() {
        let t = Array2::from_elem((2, 2), 1.5);
        let mut source = StateDict::new();
        source.insert("conv1.weight".into(), t.clone());

        let mut target = StateDict::new();
        target.insert("encoder.conv1.weight".into(), Array2::zeros((2, 2)));
        let filtered = filter_with_prefix(&source, "encoder.", &target);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered["encoder.conv1.weight"], t);

        let empty_target = StateDict::new();
        assert!(filter_with_prefix(&source, "encoder.", &empty_target).is_empty());
    }
}
