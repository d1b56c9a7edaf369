//! mtedl: evidential meta-transfer learning for few-shot classification
//!
//! A pretrained feature encoder is meta-trained together with two linear
//! evidential heads. Each few-shot task adapts the heads on its support set
//! with a differentiable inner loop; the outer loop backpropagates an
//! evidential (Dirichlet) loss on the query set through that adaptation. The
//! resulting Dirichlet strengths give per-example uncertainty, used for
//! thresholded prediction and out-of-distribution detection.
//!
//! # Modules
//!
//! - [`autograd`]: tape-based autograd over 2-D tensors, with second-order gradients
//! - [`nn`]: named parameters, linear layers and the encoder contract
//! - [`model`]: base learner, meta-transfer learner, pretrain classifier
//! - [`edl`]: evidential losses and uncertainty statistics
//! - [`data`]: datasets, episodic sampling and episode assembly
//! - [`optim`]: Adam, SGD, parameter groups and step decay
//! - [`train`]: meta trainer, pretrainer, metrics and training history
//! - [`eval`]: meta-evaluation, threshold test and OOD scoring
//! - [`io`]: checkpoints with key-prefix filtering
//! - [`config`]: experiment configuration, validation and CLI definition
//! - [`cli`]: command dispatch and logging setup

pub mod autograd;
pub mod cli;
pub mod config;
pub mod data;
pub mod edl;
pub mod eval;
pub mod io;
pub mod model;
pub mod nn;
pub mod optim;
pub mod train;

pub use autograd::Tensor;
pub use mtedl_common::{MtedlError, Result};
