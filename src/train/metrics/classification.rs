//! Classification metrics over per-class score matrices
//!
//! Scores may be logits, evidence, alpha or probabilities: only the row-wise
//! argmax matters.

use ndarray::{Array2, ArrayView1};

fn argmax(row: ArrayView1<'_, f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0
}

/// Predicted class of every row
pub fn predictions(scores: &Array2<f32>) -> Vec<usize> {
    scores.rows().into_iter().map(argmax).collect()
}

/// Fraction of rows whose argmax equals the label
///
/// # Example
///
/// ```
/// use mtedl::train::count_acc;
/// use ndarray::arr2;
///
/// let scores = arr2(&[[0.9, 0.1], [0.2, 0.8], [0.6, 0.4]]);
/// assert!((count_acc(&scores, &[0, 1, 1]) - 2.0 / 3.0).abs() < 1e-12);
/// ```
pub fn count_acc(scores: &Array2<f32>, labels: &[usize]) -> f64 {
    assert_eq!(
        scores.nrows(),
        labels.len(),
        "Scores and labels must have same length"
    );
    if labels.is_empty() {
        return 0.0;
    }
    let correct = predictions(scores)
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    correct as f64 / labels.len() as f64
}

/// Correct predictions and kept predictions among those with
/// `uncertainty <= threshold`
pub fn acc_with_threshold(
    preds: &[usize],
    labels: &[usize],
    uncertainty: &[f64],
    threshold: f64,
) -> (usize, usize) {
    preds
        .iter()
        .zip(labels)
        .zip(uncertainty)
        .filter(|(_, &u)| u <= threshold)
        .fold((0, 0), |(correct, kept), ((p, l), _)| {
            (correct + usize::from(p == l), kept + 1)
        })
}

/// Mean negative log-probability of the true class
pub fn nll(probs: &Array2<f32>, labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .enumerate()
        .map(|(row, &label)| -f64::from(probs[[row, label]].max(f32::MIN_POSITIVE)).ln())
        .sum();
    total / labels.len() as f64
}
