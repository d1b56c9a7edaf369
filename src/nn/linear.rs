//! Fully connected layer

use super::Module;
use crate::autograd::{add, broadcast_to, matmul, Tensor};
use rand::Rng;

/// Affine map `y = x W + b` with `W: in x out` and `b: 1 x out`
pub struct Linear {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl Linear {
    /// Uniform initialization in `±1/sqrt(in_features)`
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let mut sample = |n: usize| -> Vec<f32> {
            (0..n).map(|_| rng.gen_range(-bound..=bound)).collect()
        };
        let weight = sample(in_features * out_features);
        let bias = sample(out_features);
        Self {
            weight: Tensor::from_vec(in_features, out_features, weight, true),
            bias: Tensor::from_vec(1, out_features, bias, true),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.rows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.cols()
    }

    pub fn forward(&self, x: &Tensor) -> Tensor {
        linear(x, &self.weight, &self.bias)
    }

    /// Independent copy with the same values
    pub fn deep_copy(&self) -> Self {
        Self {
            weight: Tensor::new(self.weight.to_array(), self.weight.requires_grad()),
            bias: Tensor::new(self.bias.to_array(), self.bias.requires_grad()),
        }
    }
}

impl Module for Linear {
    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        vec![
            ("weight".to_string(), self.weight.clone()),
            ("bias".to_string(), self.bias.clone()),
        ]
    }
}

/// `x W + b` for arbitrary (possibly non-leaf) weight tensors
pub fn linear(x: &Tensor, weight: &Tensor, bias: &Tensor) -> Tensor {
    let out = matmul(x, weight);
    let (rows, cols) = out.shape();
    add(&out, &broadcast_to(bias, rows, cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_init_within_bound() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Linear::new(16, 4, &mut rng);
        let bound = 0.25 + 1e-6;
        assert!(layer.weight.data().iter().all(|w| w.abs() <= bound));
        assert_eq!(layer.weight.shape(), (16, 4));
        assert_eq!(layer.bias.shape(), (1, 4));
        assert_eq!((layer.in_features(), layer.out_features()), (16, 4));
    }

    #[test]
    fn test_forward_adds_bias_per_row() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = Linear::new(2, 2, &mut rng);
        layer.weight.data_mut().assign(&array![[1.0, 0.0], [0.0, 1.0]]);
        layer.bias.data_mut().assign(&array![[0.5, -0.5]]);
        let x = Tensor::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], false);
        assert_eq!(
            layer.forward(&x).to_array(),
            array![[1.5, 1.5], [3.5, 3.5], [5.5, 5.5]]
        );
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = Linear::new(2, 2, &mut rng);
        let copy = layer.deep_copy();
        copy.weight.data_mut().fill(0.0);
        assert!(layer.weight.data().iter().any(|&w| w != 0.0));
    }
}
