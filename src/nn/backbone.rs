//! Feature encoders
//!
//! The encoder is a swappable collaborator: anything that maps an input batch to
//! an embedding batch and exposes its parameters by name can back the learners.

use super::{prefixed, Linear, Module};
use crate::autograd::{leaky_relu, Tensor};
use rand::Rng;

/// Negative slope of the hidden activations
const LEAKY_SLOPE: f32 = 0.1;

/// Maps an `n x input_dim` batch to `n x embedding_dim` embeddings
pub trait Backbone: Module {
    fn embed(&self, input: &Tensor) -> Tensor;

    fn input_dim(&self) -> usize;

    fn embedding_dim(&self) -> usize;

    /// Independent copy with identical values (used for the frozen pretrain encoder)
    fn deep_copy(&self) -> Self
    where
        Self: Sized;
}

/// Stack of linear layers with LeakyReLU activations
pub struct MlpBackbone {
    layers: Vec<Linear>,
}

impl MlpBackbone {
    /// `input_dim -> hidden[0] -> ... -> embedding_dim`
    pub fn new<R: Rng>(
        input_dim: usize,
        hidden_dims: &[usize],
        embedding_dim: usize,
        rng: &mut R,
    ) -> Self {
        let dims: Vec<usize> = std::iter::once(input_dim)
            .chain(hidden_dims.iter().copied())
            .chain(std::iter::once(embedding_dim))
            .collect();
        let layers = dims
            .windows(2)
            .map(|pair| Linear::new(pair[0], pair[1], &mut *rng))
            .collect();
        Self { layers }
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl Module for MlpBackbone {
    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| prefixed(&format!("layers.{i}."), layer.named_parameters()))
            .collect()
    }
}

impl Backbone for MlpBackbone {
    fn embed(&self, input: &Tensor) -> Tensor {
        self.layers.iter().fold(input.clone(), |h, layer| {
            leaky_relu(&layer.forward(&h), LEAKY_SLOPE)
        })
    }

    fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, Linear::in_features)
    }

    fn embedding_dim(&self) -> usize {
        self.layers.last().map_or(0, Linear::out_features)
    }

    fn deep_copy(&self) -> Self {
        Self {
            layers: self.layers.iter().map(Linear::deep_copy).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{backward, sum};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn backbone() -> MlpBackbone {
        let mut rng = StdRng::seed_from_u64(42);
        MlpBackbone::new(8, &[16], 4, &mut rng)
    }

    #[test]
    fn test_dimensions_and_names() {
        let net = backbone();
        assert_eq!(net.depth(), 2);
        assert_eq!(net.input_dim(), 8);
        assert_eq!(net.embedding_dim(), 4);
        let names: Vec<_> = net.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["layers.0.weight", "layers.0.bias", "layers.1.weight", "layers.1.bias"]
        );
    }

    #[test]
    fn test_embed_shape() {
        let net = backbone();
        let x = Tensor::zeros(5, 8, false);
        assert_eq!(net.embed(&x).shape(), (5, 4));
    }

    #[test]
    fn test_frozen_copy_gets_no_gradient() {
        let net = backbone();
        let frozen = net.deep_copy();
        frozen.set_trainable(false);
        assert_eq!(net.state_dict(), frozen.state_dict());

        let x = Tensor::from_vec(2, 8, (0..16).map(|v| v as f32 / 16.0).collect(), false);
        backward(&sum(&frozen.embed(&x)), None);
        assert!(frozen.parameters().iter().all(|p| p.grad().is_none()));

        backward(&sum(&net.embed(&x)), None);
        assert!(net.parameters().iter().all(|p| p.grad().is_some()));
    }
}
