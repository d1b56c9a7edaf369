//! Autograd operations with backward passes
//!
//! This module provides differentiable operations for automatic differentiation.
//! Every backward rule is composed from the operations below, so gradient
//! expressions can be differentiated again.

mod activations;
mod basic;
mod matmul;
mod special;

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array2;
use std::rc::Rc;

// Re-export all public operations
pub use activations::{clamp, exp, leaky_relu, ln, log_softmax, relu, sigmoid, softplus};
pub use basic::{
    add, add_scalar, broadcast_to, div, mean, mul, neg, scale, sub, sum, sum_cols, sum_rows,
};
pub use matmul::{matmul, transpose};
pub use special::{digamma, lgamma, trigamma};

pub(crate) use special::{digamma_f64, lgamma_f64};

/// Wrap `data` as the output of `op` if any input tracks gradients
pub(crate) fn record<O, F>(data: Array2<f32>, inputs: &[&Tensor], op: F) -> Tensor
where
    O: BackwardOp + 'static,
    F: FnOnce() -> O,
{
    if inputs.iter().any(|t| t.requires_grad()) {
        Tensor::from_op(data, Rc::new(op()))
    } else {
        Tensor::constant(data)
    }
}

pub(crate) fn assert_same_shape(op: &str, a: &Tensor, b: &Tensor) {
    assert_eq!(
        a.shape(),
        b.shape(),
        "{op}: shape mismatch {:?} vs {:?}",
        a.shape(),
        b.shape()
    );
}
