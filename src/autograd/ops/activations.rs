//! Activation function autograd operations: exp, ln, relu, leaky_relu, sigmoid,
//! softplus, clamp, log_softmax

use super::basic::{add_scalar, broadcast_to, div, mul, neg, sub, sum_cols};
use super::record;
use crate::autograd::{BackwardOp, Tensor};
use ndarray::{Array2, Axis};

/// Elementwise exponential
pub fn exp(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::exp);
    record(data, &[a], || ExpBackward { a: a.clone() })
}

struct ExpBackward {
    a: Tensor,
}

impl BackwardOp for ExpBackward {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(mul(grad, &exp(&self.a)))]
    }
}

/// Elementwise natural logarithm
pub fn ln(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::ln);
    record(data, &[a], || LnBackward { a: a.clone() })
}

struct LnBackward {
    a: Tensor,
}

impl BackwardOp for LnBackward {
    fn name(&self) -> &'static str {
        "ln"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(div(grad, &self.a))]
    }
}

/// Piecewise-linear op whose local derivative is a constant mask
struct MaskBackward {
    name: &'static str,
    a: Tensor,
    mask: Array2<f32>,
}

impl BackwardOp for MaskBackward {
    fn name(&self) -> &'static str {
        self.name
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(mul(grad, &Tensor::constant(self.mask.clone())))]
    }
}

fn masked(
    name: &'static str,
    a: &Tensor,
    f: impl Fn(f32) -> f32,
    df: impl Fn(f32) -> f32,
) -> Tensor {
    let data = a.data().mapv(&f);
    record(data, &[a], || MaskBackward {
        name,
        a: a.clone(),
        mask: a.data().mapv(&df),
    })
}

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    masked(
        "relu",
        a,
        |x| x.max(0.0),
        |x| if x > 0.0 { 1.0 } else { 0.0 },
    )
}

/// Leaky ReLU with the given negative slope
pub fn leaky_relu(a: &Tensor, negative_slope: f32) -> Tensor {
    masked(
        "leaky_relu",
        a,
        move |x| if x > 0.0 { x } else { negative_slope * x },
        move |x| if x > 0.0 { 1.0 } else { negative_slope },
    )
}

/// Clamp every element to `[min, max]`; the gradient is zero outside the range
pub fn clamp(a: &Tensor, min: f32, max: f32) -> Tensor {
    masked(
        "clamp",
        a,
        move |x| x.clamp(min, max),
        move |x| if (min..=max).contains(&x) { 1.0 } else { 0.0 },
    )
}

fn sigmoid_scalar(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Logistic sigmoid
pub fn sigmoid(a: &Tensor) -> Tensor {
    let data = a.data().mapv(sigmoid_scalar);
    record(data, &[a], || SigmoidBackward { a: a.clone() })
}

struct SigmoidBackward {
    a: Tensor,
}

impl BackwardOp for SigmoidBackward {
    fn name(&self) -> &'static str {
        "sigmoid"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        // s' = s (1 - s)
        let s = sigmoid(&self.a);
        let ds = mul(&s, &add_scalar(&neg(&s), 1.0));
        vec![Some(mul(grad, &ds))]
    }
}

/// Softplus `ln(1 + e^x)`, computed as `max(x, 0) + ln(1 + e^-|x|)`
pub fn softplus(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x.max(0.0) + (-x.abs()).exp().ln_1p());
    record(data, &[a], || SoftplusBackward { a: a.clone() })
}

struct SoftplusBackward {
    a: Tensor,
}

impl BackwardOp for SoftplusBackward {
    fn name(&self) -> &'static str {
        "softplus"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(mul(grad, &sigmoid(&self.a)))]
    }
}

/// Row-wise log-softmax, composed from primitive ops
///
/// The per-row maximum is subtracted as a constant for stability; it cancels
/// analytically, so no gradient flows through it.
pub fn log_softmax(a: &Tensor) -> Tensor {
    let (rows, cols) = a.shape();
    let row_max = a
        .data()
        .fold_axis(Axis(1), f32::NEG_INFINITY, |&m, &x| m.max(x))
        .insert_axis(Axis(1));
    let shifted = sub(a, &broadcast_to(&Tensor::constant(row_max), rows, cols));
    let log_norm = ln(&sum_cols(&exp(&shifted)));
    sub(&shifted, &broadcast_to(&log_norm, rows, cols))
}
