//! Accuracy of the predictions the model is confident about

use crate::edl::vacuity;
use crate::train::{acc_with_threshold, predictions};
use ndarray::Array2;
use serde::Serialize;

/// `0.1, 0.2, ..., 1.0`
pub fn default_thresholds() -> Vec<f64> {
    (1..=10u32).map(|i| f64::from(i) / 10.0).collect()
}

/// Totals for one uncertainty threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdRow {
    pub threshold: f64,
    /// Correct predictions among the kept ones
    pub correct: usize,
    /// Predictions with uncertainty at or below the threshold
    pub kept: usize,
    /// All predictions seen
    pub total: usize,
}

impl ThresholdRow {
    /// `None` when no prediction passed the threshold
    pub fn accuracy(&self) -> Option<f64> {
        (self.kept > 0).then(|| self.correct as f64 / self.kept as f64)
    }

    /// Fraction of predictions kept
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.kept as f64 / self.total as f64
        }
    }
}

/// Accumulates thresholded accuracy over tasks, with uncertainty `K / S`
#[derive(Debug, Clone)]
pub struct ThresholdAccumulator {
    rows: Vec<ThresholdRow>,
}

impl ThresholdAccumulator {
    pub fn new(thresholds: &[f64]) -> Self {
        Self {
            rows: thresholds
                .iter()
                .map(|&threshold| ThresholdRow {
                    threshold,
                    correct: 0,
                    kept: 0,
                    total: 0,
                })
                .collect(),
        }
    }

    pub fn add_task(&mut self, alpha: &Array2<f32>, labels: &[usize]) {
        let preds = predictions(alpha);
        let uncertainty: Vec<f64> = alpha.rows().into_iter().map(vacuity).collect();
        for row in &mut self.rows {
            let (correct, kept) = acc_with_threshold(&preds, labels, &uncertainty, row.threshold);
            row.correct += correct;
            row.kept += kept;
            row.total += labels.len();
        }
    }

    pub fn rows(&self) -> &[ThresholdRow] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_default_thresholds() {
        let t = default_thresholds();
        assert_eq!(t.len(), 10);
        assert_eq!(t[0], 0.1);
        assert_eq!(t[9], 1.0);
    }

    #[test]
    fn test_accumulates_over_tasks() {
        let mut acc = ThresholdAccumulator::new(&[0.2, 1.0]);
        // vacuity 2/20 = 0.1 (correct), 2/4 = 0.5 (wrong)
        let alpha = arr2(&[[19.0, 1.0], [1.0, 3.0]]);
        acc.add_task(&alpha, &[0, 0]);
        acc.add_task(&alpha, &[0, 1]);

        let strict = acc.rows()[0];
        assert_eq!((strict.correct, strict.kept, strict.total), (2, 2, 4));
        assert_eq!(strict.accuracy(), Some(1.0));
        assert_eq!(strict.coverage(), 0.5);

        let loose = acc.rows()[1];
        assert_eq!((loose.correct, loose.kept), (3, 4));
        assert_eq!(loose.accuracy(), Some(0.75));
    }

    #[test]
    fn test_nothing_kept_has_no_accuracy() {
        let mut acc = ThresholdAccumulator::new(&[0.05]);
        acc.add_task(&arr2(&[[1.0, 1.0]]), &[0]);
        assert_eq!(acc.rows()[0].accuracy(), None);
        assert_eq!(acc.rows()[0].coverage(), 0.0);
    }

    #[test]
    fn test_full_threshold_keeps_everything() {
        let mut acc = ThresholdAccumulator::new(&default_thresholds());
        acc.add_task(&arr2(&[[1.0, 1.0, 1.0], [5.0, 1.0, 1.0]]), &[2, 0]);
        let last = acc.rows()[9];
        assert_eq!(last.kept, 2);
    }
}
