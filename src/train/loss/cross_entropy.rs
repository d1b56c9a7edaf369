//! Cross Entropy Loss for classification

use crate::autograd::{log_softmax, mul, scale, sum};
use crate::edl::one_hot;
use crate::Tensor;
use mtedl_common::Result;

use super::LossFn;

/// Cross Entropy Loss (for classification)
///
/// L = -mean_rows(sum(targets * log_softmax(predictions)))
///
/// # Example
///
/// ```
/// use mtedl::train::{CrossEntropyLoss, LossFn};
/// use mtedl::Tensor;
///
/// let loss_fn = CrossEntropyLoss;
/// let logits = Tensor::from_vec(1, 3, vec![2.0, 1.0, 0.5], true);
/// let targets = Tensor::from_vec(1, 3, vec![1.0, 0.0, 0.0], false); // one-hot
///
/// let loss = loss_fn.forward(&logits, &targets);
/// assert!(loss.item() > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Loss against integer class labels
    pub fn with_labels(&self, logits: &Tensor, labels: &[usize]) -> Result<Tensor> {
        let targets = one_hot(labels, logits.cols())?;
        Ok(self.forward(logits, &targets))
    }
}

impl LossFn for CrossEntropyLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Tensor {
        assert_eq!(
            predictions.shape(),
            targets.shape(),
            "Predictions and targets must have same shape"
        );
        let rows = predictions.rows().max(1) as f32;
        scale(&sum(&mul(targets, &log_softmax(predictions))), -1.0 / rows)
    }

    fn name(&self) -> &'static str {
        "CrossEntropy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::backward;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_cross_entropy_loss() {
        let logits = Tensor::from_vec(1, 3, vec![2.0, 1.0, 0.5], true);
        let targets = Tensor::from_vec(1, 3, vec![1.0, 0.0, 0.0], false);
        let loss = CrossEntropyLoss.forward(&logits, &targets);
        assert!(loss.item() > 0.0);
        assert!(loss.item().is_finite());
    }

    #[test]
    fn test_cross_entropy_gradient_is_probs_minus_targets() {
        let logits = Tensor::from_vec(1, 3, vec![2.0, 1.0, 0.5], true);
        let targets = Tensor::from_vec(1, 3, vec![1.0, 0.0, 0.0], false);
        backward(&CrossEntropyLoss.forward(&logits, &targets), None);

        let grad = logits.grad().unwrap();
        let z: f32 = [2.0f32, 1.0, 0.5].iter().map(|v| v.exp()).sum();
        assert_relative_eq!(grad[[0, 0]], 2.0f32.exp() / z - 1.0, epsilon = 1e-5);
        assert_relative_eq!(grad[[0, 2]], 0.5f32.exp() / z, epsilon = 1e-5);
    }

    #[test]
    fn test_uniform_logits_give_log_classes() {
        for nc in [2usize, 3, 5, 10] {
            let logits = Tensor::from_vec(2, nc, vec![1.0; 2 * nc], false);
            let loss = CrossEntropyLoss.with_labels(&logits, &[0, nc - 1]).unwrap();
            assert_relative_eq!(loss.item(), (nc as f32).ln(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_label_out_of_range_is_error() {
        let logits = Tensor::zeros(1, 3, false);
        assert!(CrossEntropyLoss.with_labels(&logits, &[3]).is_err());
    }

    #[test]
    #[should_panic(expected = "must have same shape")]
    fn test_cross_entropy_mismatched_shapes() {
        let pred = Tensor::zeros(1, 2, true);
        let target = Tensor::zeros(1, 3, false);
        CrossEntropyLoss.forward(&pred, &target);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_finite_and_non_negative(
            nc in 2..=10usize,
            target in 0..10usize,
            scale in 0.1f32..100.0,
            seed in 0..1000u32,
        ) {
            let target = target % nc;
            let logits: Vec<f32> = (0..nc)
                .map(|i| ((i as f32 + seed as f32) * 0.73).cos() * scale)
                .collect();
            let pred = Tensor::from_vec(1, nc, logits, false);
            let val = CrossEntropyLoss.with_labels(&pred, &[target]).unwrap().item();
            prop_assert!(val.is_finite());
            prop_assert!(val >= -1e-5);
        }
    }
}
