//! Evidential deep learning
//!
//! Class evidence `e >= 0` parameterizes a Dirichlet distribution with
//! `alpha = e + 1`. This module provides the evidential loss family used for
//! training and the per-example uncertainty statistics used for OOD scoring.

mod loss;
mod uncertainty;

pub use loss::{
    annealing_coefficient, dirichlet_alpha, edl_loss, kl_divergence, one_hot, EdlLossType,
    EvidentialLoss,
};
pub use uncertainty::{
    differential_entropy, expected_probability, mutual_information, precision, vacuity,
    UncertaintyScores,
};
