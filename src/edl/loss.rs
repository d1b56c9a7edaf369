//! Evidential loss family (Sensoy et al., 2018)
//!
//! All variants share the annealed KL regularizer toward the uniform
//! Dirichlet(1, ..., 1), applied after removing the evidence of the true class.

use crate::autograd::{
    add, add_scalar, broadcast_to, digamma, lgamma, ln, mean, mul, scale, sub, sum_cols, Tensor,
};
use crate::train::LossFn;
use mtedl_common::{MtedlError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data-fit term of the evidential loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdlLossType {
    /// Expected squared error plus the Dirichlet variance
    Mse,
    /// Type-II maximum likelihood: `sum y (ln S - ln alpha)`
    #[default]
    Log,
    /// Bayes risk of cross-entropy: `sum y (ψ(S) - ψ(alpha))`
    Digamma,
}

impl EdlLossType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mse => "mse",
            Self::Log => "log",
            Self::Digamma => "digamma",
        }
    }
}

impl fmt::Display for EdlLossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdlLossType {
    type Err = MtedlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mse" => Ok(Self::Mse),
            "log" => Ok(Self::Log),
            "digamma" => Ok(Self::Digamma),
            other => Err(MtedlError::config(
                "loss_type",
                format!("unknown loss type '{other}'"),
                "Use one of: mse, log, digamma",
            )),
        }
    }
}

/// Constant `n x num_classes` one-hot matrix
pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Tensor> {
    let mut data = Array2::zeros((labels.len(), num_classes));
    for (row, &label) in labels.iter().enumerate() {
        if label >= num_classes {
            return Err(MtedlError::config(
                "labels",
                format!("label {label} at position {row} is outside 0..{num_classes}"),
                "Labels must be canonicalized to 0..way",
            ));
        }
        data[[row, label]] = 1.0;
    }
    Ok(Tensor::constant(data))
}

/// `alpha = evidence + 1`
pub fn dirichlet_alpha(evidence: &Tensor) -> Tensor {
    add_scalar(evidence, 1.0)
}

/// KL annealing weight `min(1, epoch / annealing_step)`
///
/// A zero `annealing_step` applies the full regularizer from the start.
pub fn annealing_coefficient(epoch: usize, annealing_step: usize) -> f32 {
    if annealing_step == 0 {
        return 1.0;
    }
    (epoch as f32 / annealing_step as f32).min(1.0)
}

/// Row-wise `KL(Dir(alpha) || Dir(1))` as an `n x 1` tensor
pub fn kl_divergence(alpha: &Tensor, num_classes: usize) -> Tensor {
    let (rows, cols) = alpha.shape();
    let strength = sum_cols(alpha);
    let log_norm_uniform = statrs::function::gamma::ln_gamma(num_classes as f64) as f32;

    let first = add_scalar(
        &sub(&lgamma(&strength), &sum_cols(&lgamma(alpha))),
        -log_norm_uniform,
    );
    let digamma_gap = sub(
        &digamma(alpha),
        &broadcast_to(&digamma(&strength), rows, cols),
    );
    let second = sum_cols(&mul(&add_scalar(alpha, -1.0), &digamma_gap));
    add(&first, &second)
}

/// Per-example data-fit term, `n x 1`
fn data_fit(loss_type: EdlLossType, y: &Tensor, alpha: &Tensor) -> Tensor {
    let (rows, cols) = alpha.shape();
    let strength = sum_cols(alpha);
    let strength_b = broadcast_to(&strength, rows, cols);

    match loss_type {
        EdlLossType::Mse => {
            let p = crate::autograd::div(alpha, &strength_b);
            let err = sub(y, &p);
            let err_term = sum_cols(&mul(&err, &err));
            // p (1 - p) / (S + 1)
            let var = crate::autograd::div(
                &mul(&p, &add_scalar(&scale(&p, -1.0), 1.0)),
                &add_scalar(&strength_b, 1.0),
            );
            add(&err_term, &sum_cols(&var))
        }
        EdlLossType::Log => sum_cols(&mul(y, &sub(&ln(&strength_b), &ln(alpha)))),
        EdlLossType::Digamma => sum_cols(&mul(y, &sub(&digamma(&strength_b), &digamma(alpha)))),
    }
}

/// Mean over the batch of `data_fit + annealing * KL(alpha_tilde || 1)`
///
/// `alpha_tilde = (alpha - 1)(1 - y) + 1` removes the evidence of the true class.
pub fn edl_loss(
    loss_type: EdlLossType,
    alpha: &Tensor,
    labels: &[usize],
    epoch: usize,
    num_classes: usize,
    annealing_step: usize,
) -> Result<Tensor> {
    let (rows, cols) = alpha.shape();
    if rows != labels.len() || cols != num_classes {
        return Err(MtedlError::ShapeMismatch {
            context: "evidential loss".into(),
            expected: vec![labels.len(), num_classes],
            actual: vec![rows, cols],
        });
    }
    let y = one_hot(labels, num_classes)?;
    Ok(evidential_objective(
        loss_type,
        alpha,
        &y,
        annealing_coefficient(epoch, annealing_step),
    ))
}

fn evidential_objective(
    loss_type: EdlLossType,
    alpha: &Tensor,
    y: &Tensor,
    coefficient: f32,
) -> Tensor {
    let fit = data_fit(loss_type, y, alpha);
    let not_target = add_scalar(&scale(y, -1.0), 1.0);
    let kl_alpha = add_scalar(&mul(&add_scalar(alpha, -1.0), &not_target), 1.0);
    let kl = kl_divergence(&kl_alpha, alpha.cols());
    mean(&add(&fit, &scale(&kl, coefficient)))
}

/// Evidential loss bound to a class count and annealing schedule
///
/// As a [`LossFn`], predictions are Dirichlet parameters `alpha` and targets
/// are one-hot rows; the epoch set with [`EvidentialLoss::at_epoch`] drives the
/// KL annealing.
#[derive(Debug, Clone, Copy)]
pub struct EvidentialLoss {
    pub loss_type: EdlLossType,
    pub num_classes: usize,
    pub annealing_step: usize,
    epoch: usize,
}

impl EvidentialLoss {
    pub fn new(loss_type: EdlLossType, num_classes: usize, annealing_step: usize) -> Self {
        Self {
            loss_type,
            num_classes,
            annealing_step,
            epoch: 0,
        }
    }

    pub fn at_epoch(mut self, epoch: usize) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Loss for integer labels
    pub fn compute(&self, alpha: &Tensor, labels: &[usize]) -> Result<Tensor> {
        edl_loss(
            self.loss_type,
            alpha,
            labels,
            self.epoch,
            self.num_classes,
            self.annealing_step,
        )
    }
}

impl LossFn for EvidentialLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.shape(),
            targets.shape(),
            "alpha and one-hot targets must have the same shape"
        );
        evidential_objective(
            self.loss_type,
            predictions,
            targets,
            annealing_coefficient(self.epoch, self.annealing_step),
        )
    }

    fn name(&self) -> &str {
        match self.loss_type {
            EdlLossType::Mse => "EDL-MSE",
            EdlLossType::Log => "EDL-Log",
            EdlLossType::Digamma => "EDL-Digamma",
        }
    }
}
