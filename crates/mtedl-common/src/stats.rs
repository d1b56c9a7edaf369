//! Running statistics used by training and evaluation loops.

/// Running mean of scalar values.
///
/// One instance per (metric, phase) pair; create a fresh one for every epoch or
/// evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct Averager {
    n: usize,
    v: f64,
}

impl Averager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a value into the running mean.
    pub fn add(&mut self, x: f64) {
        self.v = (self.v * self.n as f64 + x) / (self.n as f64 + 1.0);
        self.n += 1;
    }

    /// Current mean, `0.0` before the first value.
    pub fn item(&self) -> f64 {
        self.v
    }

    pub fn count(&self) -> usize {
        self.n
    }
}

/// Mean, population standard deviation and 95% confidence half-width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub ci95: f64,
}

/// Accumulates every value so that the spread can be reported after each task.
///
/// Non-finite values are rejected so that a degenerate task never poisons the
/// aggregate; [`RunningStats::skipped`] reports how many were dropped.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    values: Vec<f64>,
    skipped: usize,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; returns `false` (and counts it as skipped) if it is not finite.
    pub fn add(&mut self, x: f64) -> bool {
        if x.is_finite() {
            self.values.push(x);
            true
        } else {
            self.skipped += 1;
            false
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `None` until at least one finite value was added.
    pub fn summary(&self) -> Option<Summary> {
        summarize(&self.values)
    }
}

/// Mean, population std and `1.96 * std / sqrt(n)` of a sample.
pub fn summarize(data: &[f64]) -> Option<Summary> {
    if data.is_empty() {
        return None;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    Some(Summary {
        mean,
        std,
        ci95: 1.96 * std / n.sqrt(),
    })
}

/// Mean and 95% confidence half-width, `(0.0, 0.0)` for an empty sample.
pub fn compute_confidence_interval(data: &[f64]) -> (f64, f64) {
    summarize(data).map_or((0.0, 0.0), |s| (s.mean, s.ci95))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_averager_mean() {
        let mut avg = Averager::new();
        assert_eq!(avg.item(), 0.0);
        avg.add(1.0);
        avg.add(2.0);
        avg.add(6.0);
        assert_relative_eq!(avg.item(), 3.0, epsilon = 1e-12);
        assert_eq!(avg.count(), 3);
    }

    #[test]
    fn test_single_value_has_zero_spread() {
        let mut stats = RunningStats::new();
        stats.add(0.8);
        let s = stats.summary().unwrap();
        assert_relative_eq!(s.mean, 0.8, epsilon = 1e-12);
        assert_eq!(s.std, 0.0);
        assert_eq!(s.ci95, 0.0);
    }

    #[test]
    fn test_two_values_spread() {
        let mut stats = RunningStats::new();
        stats.add(0.8);
        stats.add(0.6);
        let s = stats.summary().unwrap();
        assert_relative_eq!(s.mean, 0.7, epsilon = 1e-12);
        assert_relative_eq!(s.std, 0.1, epsilon = 1e-12);
        assert_relative_eq!(s.ci95, 1.96 * 0.1 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_nan_is_skipped() {
        let mut stats = RunningStats::new();
        assert!(stats.add(0.9));
        assert!(!stats.add(f64::NAN));
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.skipped(), 1);
        assert_relative_eq!(stats.summary().unwrap().mean, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        assert!(RunningStats::new().summary().is_none());
        assert_eq!(compute_confidence_interval(&[]), (0.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_averager_matches_mean(xs in prop::collection::vec(-100.0f64..100.0, 1..50)) {
            let mut avg = Averager::new();
            for &x in &xs {
                avg.add(x);
            }
            let mean = xs.iter().sum::<f64>() / xs.len() as f64;
            prop_assert!((avg.item() - mean).abs() < 1e-9);
        }

        #[test]
        fn prop_ci95_non_negative(xs in prop::collection::vec(0.0f64..1.0, 1..50)) {
            let s = summarize(&xs).unwrap();
            prop_assert!(s.std >= 0.0);
            prop_assert!(s.ci95 >= 0.0);
            prop_assert!(s.ci95 <= 1.96 * s.std + 1e-12);
        }
    }
}
