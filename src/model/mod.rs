//! Learners built on top of a feature encoder
//!
//! - [`BaseLearner`]: linear evidential head with differentiable inner-loop
//!   adaptation over immutable [`HeadParams`] snapshots
//! - [`MtlLearner`]: meta-transfer learner combining a trainable encoder with a
//!   frozen copy of the pretrained one
//! - [`PretrainClassifier`]: encoder plus a classifier over all base classes

mod base_learner;
mod evidence;
mod mtl;
mod pretrain;

pub use base_learner::{BaseLearner, HeadParams};
pub use evidence::EvidenceActivation;
pub use mtl::{LearnerSettings, Mode, MtlLearner};
pub use pretrain::PretrainClassifier;
