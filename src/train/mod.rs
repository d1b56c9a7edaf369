//! Training loops and their bookkeeping
//!
//! This module provides:
//! - Loss functions (`CrossEntropyLoss`, and the `LossFn` trait the evidential
//!   loss also implements)
//! - Evaluation metrics (accuracy, thresholded accuracy, calibration error)
//! - The meta trainer and the supervised pretrainer
//! - Training history (`trlog.json`) and a wall-clock timer
//!
//! # Example
//!
//! ```no_run
//! use mtedl::config::ExperimentConfig;
//! use mtedl::data::{FeatureDataset, Split};
//! use mtedl::model::MtlLearner;
//! use mtedl::nn::MlpBackbone;
//! use mtedl::train::MetaTrainer;
//!
//! # fn main() -> mtedl_common::Result<()> {
//! let config = ExperimentConfig::default();
//! let trainset = FeatureDataset::load(&config.dataset_path(Split::Train))?;
//! let valset = FeatureDataset::load(&config.dataset_path(Split::Val))?;
//! let mut rng = config.rng();
//! let encoder = MlpBackbone::new(640, &config.encoder.hidden, config.encoder.embedding_dim, &mut rng);
//! let model = MtlLearner::new(encoder, config.learner_settings(), &mut rng);
//!
//! let mut trainer = MetaTrainer::new(config, model, trainset, valset)?;
//! let result = trainer.train()?;
//! println!("best val acc {:.4} at epoch {}", result.max_acc, result.max_acc_epoch);
//! # Ok(())
//! # }
//! ```

mod log;
mod loss;
mod metrics;
mod timer;
mod trainer;

pub use log::{TrainingLog, TRLOG_FILE};
pub use loss::{CrossEntropyLoss, LossFn};
pub use metrics::{
    acc_with_threshold, count_acc, expected_calibration_error, nll, predictions, ECE_BINS,
};
pub use timer::{format_duration, Timer};
pub use trainer::{MetaTrainer, PreTrainer, TrainResult};

pub(crate) use trainer::ensure_finite;
