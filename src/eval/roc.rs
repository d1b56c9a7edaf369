//! Area under the ROC curve

use mtedl_common::{MtedlError, Result};
use std::cmp::Ordering;

/// ROC-AUC of `scores` as a detector of the positive class
///
/// Uses the rank-sum (Mann-Whitney) form with tied scores sharing their
/// average rank, which equals the trapezoidal area under the ROC curve.
/// Returns NaN when either class is absent or a score is NaN.
///
/// # Example
///
/// ```
/// use mtedl::eval::roc_auc;
///
/// let auc = roc_auc(&[0.1, 0.4, 0.35, 0.8], &[false, false, true, true]);
/// assert!((auc - 0.75).abs() < 1e-12);
/// ```
pub fn roc_auc(scores: &[f64], positive: &[bool]) -> f64 {
    assert_eq!(
        scores.len(),
        positive.len(),
        "Scores and labels must have same length"
    );
    let n_pos = positive.iter().filter(|&&p| p).count();
    let n_neg = positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || scores.iter().any(|s| s.is_nan()) {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks start..end (1-based start+1..=end) share their mean
        let rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| positive[i]).count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    (positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}

/// [`roc_auc`] with degenerate inputs reported as [`MtedlError::UndefinedMetric`]
pub fn try_roc_auc(metric: &str, scores: &[f64], positive: &[bool]) -> Result<f64> {
    let auc = roc_auc(scores, positive);
    if auc.is_nan() {
        let reason = if positive.iter().all(|&p| p) || positive.iter().all(|&p| !p) {
            format!("only one class among {} examples", positive.len())
        } else {
            "scores contain NaN".to_string()
        };
        return Err(MtedlError::UndefinedMetric {
            metric: metric.to_string(),
            reason,
        });
    }
    Ok(auc)
}
