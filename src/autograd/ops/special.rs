//! Gamma-family special functions: lgamma, digamma, trigamma
//!
//! Arguments are floored at [`MIN_ARG`] before evaluation; Dirichlet parameters
//! are `>= 1` by construction, the floor only keeps degenerate inputs finite.

use super::basic::mul;
use super::record;
use crate::autograd::{BackwardOp, Tensor};
use statrs::function::gamma;

const MIN_ARG: f64 = 1e-6;

pub(crate) fn lgamma_f64(x: f64) -> f64 {
    gamma::ln_gamma(x.max(MIN_ARG))
}

pub(crate) fn digamma_f64(x: f64) -> f64 {
    gamma::digamma(x.max(MIN_ARG))
}

/// ψ'(x) via the recurrence ψ'(x) = ψ'(x + 1) + 1/x² and the asymptotic series
pub(crate) fn trigamma_f64(x: f64) -> f64 {
    let mut x = x.max(MIN_ARG);
    let mut acc = 0.0;
    while x < 6.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    acc + inv
        + 0.5 * inv2
        + inv * inv2 * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 * (1.0 / 42.0 - inv2 / 30.0)))
}

/// ψ''(x) via the recurrence ψ''(x) = ψ''(x + 1) - 2/x³ and the asymptotic series
pub(crate) fn tetragamma_f64(x: f64) -> f64 {
    let mut x = x.max(MIN_ARG);
    let mut acc = 0.0;
    while x < 6.0 {
        acc -= 2.0 / (x * x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    acc - inv2
        - inv2 * inv
        - 0.5 * inv2 * inv2
        + inv2 * inv2 * inv2 * (1.0 / 6.0 - inv2 * (1.0 / 6.0 - inv2 * 0.3))
}

fn map_f64(a: &Tensor, f: fn(f64) -> f64) -> ndarray::Array2<f32> {
    a.data().mapv(|x| f(f64::from(x)) as f32)
}

/// Elementwise `ln Γ(x)`
pub fn lgamma(a: &Tensor) -> Tensor {
    record(map_f64(a, lgamma_f64), &[a], || LgammaBackward { a: a.clone() })
}

struct LgammaBackward {
    a: Tensor,
}

impl BackwardOp for LgammaBackward {
    fn name(&self) -> &'static str {
        "lgamma"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(mul(grad, &digamma(&self.a)))]
    }
}

/// Elementwise digamma ψ(x)
pub fn digamma(a: &Tensor) -> Tensor {
    record(map_f64(a, digamma_f64), &[a], || DigammaBackward { a: a.clone() })
}

struct DigammaBackward {
    a: Tensor,
}

impl BackwardOp for DigammaBackward {
    fn name(&self) -> &'static str {
        "digamma"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        vec![Some(mul(grad, &trigamma(&self.a)))]
    }
}

/// Elementwise trigamma ψ'(x)
///
/// Differentiable once more; the tetragamma factor in its backward pass is
/// treated as a constant.
pub fn trigamma(a: &Tensor) -> Tensor {
    record(map_f64(a, trigamma_f64), &[a], || TrigammaBackward {
        a: a.clone(),
    })
}

struct TrigammaBackward {
    a: Tensor,
}

impl BackwardOp for TrigammaBackward {
    fn name(&self) -> &'static str {
        "trigamma"
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.a.clone()]
    }

    fn backward(&self, grad: &Tensor, _needs: &[bool]) -> Vec<Option<Tensor>> {
        let local = Tensor::constant(map_f64(&self.a, tetragamma_f64));
        vec![Some(mul(grad, &local))]
    }
}
