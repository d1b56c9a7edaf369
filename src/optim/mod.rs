//! Optimizers for training neural networks

mod adam;
mod optimizer;
mod param_groups;
mod scheduler;
mod sgd;

pub use adam::Adam;
pub use optimizer::Optimizer;
pub use param_groups::{ParamGroup, ParamGroups};
pub use scheduler::{LRScheduler, StepDecayLR};
pub use sgd::SGD;
