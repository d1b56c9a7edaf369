//! Training result types

use crate::train::TrainingLog;
use std::path::PathBuf;

/// Summary of a finished training run
#[derive(Debug, Clone)]
pub struct TrainResult {
    /// Number of epochs run
    pub epochs: usize,
    /// Best validation accuracy
    pub max_acc: f64,
    /// Epoch (1-based) of the best validation accuracy, 0 if it never improved
    pub max_acc_epoch: usize,
    pub final_train_loss: f64,
    pub final_val_acc: f64,
    /// Total training time in seconds
    pub elapsed_secs: f64,
    /// Directory holding the checkpoints and `trlog.json`
    pub save_dir: PathBuf,
}

impl TrainResult {
    pub(crate) fn from_log(log: &TrainingLog, elapsed_secs: f64, save_dir: PathBuf) -> Self {
        Self {
            epochs: log.epochs(),
            max_acc: log.max_acc,
            max_acc_epoch: log.max_acc_epoch,
            final_train_loss: log.train_loss.last().copied().unwrap_or(0.0),
            final_val_acc: log.val_acc.last().copied().unwrap_or(0.0),
            elapsed_secs,
            save_dir,
        }
    }
}
