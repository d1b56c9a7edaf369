//! Expected calibration error

use ndarray::Array2;

/// Number of equal-width confidence bins used by meta-evaluation
pub const ECE_BINS: usize = 15;

/// Expected calibration error of row-stochastic `probs`
///
/// Confidence is the largest probability of a row. Rows fall into `n_bins`
/// equal-width bins over (0, 1]; each bin contributes
/// `|mean confidence - accuracy| * fraction of rows in the bin`.
pub fn expected_calibration_error(probs: &Array2<f32>, labels: &[usize], n_bins: usize) -> f64 {
    assert_eq!(
        probs.nrows(),
        labels.len(),
        "Probabilities and labels must have same length"
    );
    if labels.is_empty() || n_bins == 0 {
        return 0.0;
    }

    let mut conf_sum = vec![0.0f64; n_bins];
    let mut correct = vec![0usize; n_bins];
    let mut count = vec![0usize; n_bins];

    for (row, &label) in probs.rows().into_iter().zip(labels) {
        let (pred, conf) = row
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });
        let conf = f64::from(conf);
        if conf <= 0.0 {
            continue;
        }
        // bin b covers (b / n, (b + 1) / n]
        let bin = ((conf * n_bins as f64).ceil() as usize).clamp(1, n_bins) - 1;
        conf_sum[bin] += conf;
        correct[bin] += usize::from(pred == label);
        count[bin] += 1;
    }

    let total = labels.len() as f64;
    (0..n_bins)
        .filter(|&b| count[b] > 0)
        .map(|b| {
            let n = count[b] as f64;
            let gap = (conf_sum[b] / n - correct[b] as f64 / n).abs();
            gap * n / total
        })
        .sum()
}
