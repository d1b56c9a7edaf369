//! Tape-based autograd engine
//!
//! Provides automatic differentiation over 2-D `f32` tensors using a computational
//! graph. Backward rules are themselves built from differentiable operations, so
//! gradients can be taken through gradient steps:
//!
//! ```
//! use mtedl::autograd::{grad, mul, sum, Tensor};
//!
//! let x = Tensor::from_vec(1, 1, vec![2.0], true);
//! let y = sum(&mul(&mul(&x, &x), &x));
//! let dy = grad(&y, &[x.clone()], true);
//! let d2y = grad(&sum(&dy[0]), &[x], false);
//! assert_eq!(d2y[0].item(), 12.0);
//! ```

mod backward;
mod ops;
mod tensor;

#[cfg(test)]
mod tests;

pub use backward::{backward, grad, BackwardOp};
pub use ops::*;
pub(crate) use ops::{digamma_f64, lgamma_f64};
pub use tensor::Tensor;
