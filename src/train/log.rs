//! Per-epoch training history (`trlog.json`)

use crate::io::write_json_atomic;
use mtedl_common::{MtedlError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name of the history inside a run directory
pub const TRLOG_FILE: &str = "trlog.json";

/// Loss and accuracy histories plus the best validation accuracy
///
/// The file is rewritten in full after every epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLog {
    /// Hyperparameter snapshot of the run
    pub args: serde_json::Value,
    pub train_loss: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub train_acc: Vec<f64>,
    pub val_acc: Vec<f64>,
    pub max_acc: f64,
    pub max_acc_epoch: usize,
}

impl TrainingLog {
    pub fn new(args: serde_json::Value) -> Self {
        Self {
            args,
            train_loss: Vec::new(),
            val_loss: Vec::new(),
            train_acc: Vec::new(),
            val_acc: Vec::new(),
            max_acc: 0.0,
            max_acc_epoch: 0,
        }
    }

    pub fn epochs(&self) -> usize {
        self.train_loss.len()
    }

    pub fn record_epoch(&mut self, train_loss: f64, train_acc: f64, val_loss: f64, val_acc: f64) {
        self.train_loss.push(train_loss);
        self.train_acc.push(train_acc);
        self.val_loss.push(val_loss);
        self.val_acc.push(val_acc);
    }

    /// Record `val_acc` as the new best if it strictly exceeds the current one
    pub fn improve(&mut self, val_acc: f64, epoch: usize) -> bool {
        if val_acc > self.max_acc {
            self.max_acc = val_acc;
            self.max_acc_epoch = epoch;
            true
        } else {
            false
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| MtedlError::io(format!("reading training log {}", path.display()), e))?;
        serde_json::from_str(&text).map_err(|e| {
            MtedlError::serialization(format!("invalid training log {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_improve_is_strict() {
        let mut log = TrainingLog::new(json!({}));
        assert!(log.improve(0.5, 1));
        assert!(!log.improve(0.5, 2));
        assert!(log.improve(0.6, 3));
        assert_eq!(log.max_acc_epoch, 3);
        assert!(!log.improve(0.0, 4));
    }

    #[test]
    fn test_save_overwrites_and_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TRLOG_FILE);
        let mut log = TrainingLog::new(json!({"way": 5, "loss_type": "log"}));

        log.record_epoch(1.2, 0.4, 1.1, 0.45);
        log.improve(0.45, 1);
        log.save(&path).unwrap();

        log.record_epoch(1.0, 0.5, 0.9, 0.55);
        log.improve(0.55, 2);
        log.save(&path).unwrap();

        let loaded = TrainingLog::load(&path).unwrap();
        assert_eq!(loaded, log);
        assert_eq!(loaded.epochs(), 2);
        assert_eq!(loaded.args["way"], 5);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_json_keys() {
        let value = serde_json::to_value(TrainingLog::new(json!(null))).unwrap();
        for key in ["args", "train_loss", "val_loss", "train_acc", "val_acc", "max_acc", "max_acc_epoch"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = TrainingLog::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MtedlError::Io { .. }));
    }
}
