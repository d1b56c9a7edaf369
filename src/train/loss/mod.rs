//! Loss functions for training
//!
//! - [`CrossEntropyLoss`] - softmax cross-entropy for the pretraining classifier
//! - [`EvidentialLoss`](crate::edl::EvidentialLoss) implements [`LossFn`] for
//!   meta-training

mod cross_entropy;
mod traits;

pub use cross_entropy::CrossEntropyLoss;
pub use traits::LossFn;
