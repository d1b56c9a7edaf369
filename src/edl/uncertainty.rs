//! Per-example uncertainty statistics of a Dirichlet prediction
//!
//! All statistics grow with uncertainty, so each can be used directly as an
//! OOD detection score. Computed in `f64` on plain arrays: they are evaluation
//! outputs and never take part in backpropagation.

use crate::autograd::{digamma_f64, lgamma_f64};
use ndarray::{Array2, ArrayView1, Axis};

/// Differential entropy `ln B(alpha) + (S - K) ψ(S) - Σ (alpha_k - 1) ψ(alpha_k)`
pub fn differential_entropy(alpha: ArrayView1<'_, f32>) -> f64 {
    let k = alpha.len() as f64;
    let strength = strength(alpha);
    let ln_beta = alpha.iter().map(|&a| lgamma_f64(f64::from(a))).sum::<f64>() - lgamma_f64(strength);
    let weighted: f64 = alpha
        .iter()
        .map(|&a| {
            let a = f64::from(a);
            (a - 1.0) * digamma_f64(a)
        })
        .sum();
    ln_beta + (strength - k) * digamma_f64(strength) - weighted
}

/// Mutual information between the label and the categorical parameters
///
/// `-Σ p_k (ln p_k - ψ(alpha_k + 1) + ψ(S + 1))` with `p = alpha / S`.
pub fn mutual_information(alpha: ArrayView1<'_, f32>) -> f64 {
    let strength = strength(alpha);
    let psi_total = digamma_f64(strength + 1.0);
    -alpha
        .iter()
        .map(|&a| {
            let a = f64::from(a);
            let p = a / strength;
            p * (p.ln() - digamma_f64(a + 1.0) + psi_total)
        })
        .sum::<f64>()
}

/// Inverse Dirichlet strength `1 / S`
pub fn precision(alpha: ArrayView1<'_, f32>) -> f64 {
    1.0 / strength(alpha)
}

/// Subjective-logic uncertainty mass `K / S`, in `(0, 1]`
pub fn vacuity(alpha: ArrayView1<'_, f32>) -> f64 {
    alpha.len() as f64 / strength(alpha)
}

fn strength(alpha: ArrayView1<'_, f32>) -> f64 {
    alpha.iter().map(|&a| f64::from(a)).sum()
}

/// Dirichlet mean `alpha / S`, row by row
pub fn expected_probability(alpha: &Array2<f32>) -> Array2<f32> {
    let strength = alpha.sum_axis(Axis(1)).insert_axis(Axis(1));
    alpha / &strength
}

/// The three OOD scores for every row of an `alpha` matrix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UncertaintyScores {
    pub differential_entropy: Vec<f64>,
    pub mutual_information: Vec<f64>,
    pub precision: Vec<f64>,
}

impl UncertaintyScores {
    pub fn from_alpha(alpha: &Array2<f32>) -> Self {
        let rows = alpha.axis_iter(Axis(0));
        let mut scores = Self::default();
        for row in rows {
            scores.differential_entropy.push(differential_entropy(row));
            scores.mutual_information.push(mutual_information(row));
            scores.precision.push(precision(row));
        }
        scores
    }

    pub fn len(&self) -> usize {
        self.precision.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precision.is_empty()
    }

    /// `self` followed by `other`, statistic by statistic
    pub fn concat(&self, other: &Self) -> Self {
        let join = |a: &[f64], b: &[f64]| a.iter().chain(b).copied().collect();
        Self {
            differential_entropy: join(&self.differential_entropy, &other.differential_entropy),
            mutual_information: join(&self.mutual_information, &other.mutual_information),
            precision: join(&self.precision, &other.precision),
        }
    }
}
