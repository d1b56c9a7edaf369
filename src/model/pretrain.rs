//! Supervised warm-start model

use super::{BaseLearner, EvidenceActivation};
use crate::autograd::Tensor;
use crate::nn::{prefixed, Backbone, Linear, Module, StateDict};
use mtedl_common::Result;
use rand::Rng;

/// Encoder with a linear classifier over every base class
///
/// Few-shot validation during pretraining goes through `val_head`, a separate
/// `way`-class head that is adapted per episode and never trained directly.
pub struct PretrainClassifier<B: Backbone> {
    encoder: B,
    classifier: Linear,
    val_head: BaseLearner,
}

impl<B: Backbone> PretrainClassifier<B> {
    pub fn new<R: Rng>(
        encoder: B,
        num_classes: usize,
        way: usize,
        activation: EvidenceActivation,
        rng: &mut R,
    ) -> Self {
        let dim = encoder.embedding_dim();
        Self {
            classifier: Linear::new(dim, num_classes, rng),
            val_head: BaseLearner::with_dims(dim, way, activation, rng),
            encoder,
        }
    }

    pub fn encoder(&self) -> &B {
        &self.encoder
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.out_features()
    }

    /// Class logits for a batch
    pub fn forward(&self, input: &Tensor) -> Tensor {
        self.classifier.forward(&self.encoder.embed(input))
    }

    /// Few-shot evidence for an episode: the validation head is adapted on the
    /// (detached) support embeddings and applied to the query embeddings
    pub fn episode_evidence(
        &self,
        support: &Tensor,
        support_labels: &[usize],
        query: &Tensor,
        num_steps: usize,
        step_size: f32,
    ) -> Result<Tensor> {
        let support_embedding = self.encoder.embed(support).detach();
        let query_embedding = self.encoder.embed(query).detach();
        self.val_head.adapt_and_predict(
            &support_embedding,
            support_labels,
            &query_embedding,
            num_steps,
            step_size,
            false,
        )
    }

    /// Encoder weights only, without a prefix (the pretrain checkpoint format)
    pub fn encoder_state_dict(&self) -> StateDict {
        self.encoder.state_dict()
    }
}

impl<B: Backbone> Module for PretrainClassifier<B> {
    /// Trainable parameters; the validation head is not part of the model
    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = prefixed("encoder.", self.encoder.named_parameters());
        params.extend(prefixed("classifier.", self.classifier.named_parameters()));
        params
    }
}
