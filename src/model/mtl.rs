//! Meta-transfer learner
//!
//! Parameter naming:
//!
//! | prefix                | role                                         |
//! |-----------------------|----------------------------------------------|
//! | `encoder.`            | encoder updated by the outer optimizer       |
//! | `pre_encoder.`        | frozen copy of the pretrained encoder        |
//! | `meta_base_learner.`  | head adapted on top of `encoder`             |
//! | `pre_base_learner.`   | head adapted on top of `pre_encoder`         |

use super::{BaseLearner, EvidenceActivation};
use crate::autograd::{add, scale, Tensor};
use crate::io::filter_with_prefix;
use crate::nn::{prefixed, Backbone, Module, StateDict};
use mtedl_common::{MtedlError, Result};
use rand::Rng;
use std::path::Path;
use tracing::debug;

/// Training mode keeps the inner-loop graph; evaluation mode detaches it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// Inner-loop and evidence-combination hyperparameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnerSettings {
    pub way: usize,
    pub update_step: usize,
    pub meta_base_lr: f32,
    pub pre_base_lr: f32,
    pub pretrain_evidence_weight: f32,
    pub activation: EvidenceActivation,
}

pub struct MtlLearner<B: Backbone> {
    encoder: B,
    pre_encoder: B,
    meta_base_learner: BaseLearner,
    pre_base_learner: BaseLearner,
    settings: LearnerSettings,
    mode: Mode,
}

impl<B: Backbone> MtlLearner<B> {
    /// Build around `encoder`; the pretrain branch starts as a frozen copy of it
    pub fn new<R: Rng>(encoder: B, settings: LearnerSettings, rng: &mut R) -> Self {
        let pre_encoder = encoder.deep_copy();
        pre_encoder.set_trainable(false);
        let dim = encoder.embedding_dim();
        Self {
            meta_base_learner: BaseLearner::with_dims(dim, settings.way, settings.activation, rng),
            pre_base_learner: BaseLearner::with_dims(dim, settings.way, settings.activation, rng),
            encoder,
            pre_encoder,
            settings,
            mode: Mode::Train,
        }
    }

    pub fn settings(&self) -> &LearnerSettings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn encoder(&self) -> &B {
        &self.encoder
    }

    pub fn meta_base_learner(&self) -> &BaseLearner {
        &self.meta_base_learner
    }

    pub fn pre_base_learner(&self) -> &BaseLearner {
        &self.pre_base_learner
    }

    /// Trainable encoder parameters (first optimizer group)
    pub fn encoder_parameters(&self) -> Vec<Tensor> {
        self.encoder
            .parameters()
            .into_iter()
            .filter(Tensor::requires_grad)
            .collect()
    }

    /// Both heads (second optimizer group)
    pub fn head_parameters(&self) -> Vec<Tensor> {
        let mut params = self.meta_base_learner.parameters();
        params.extend(self.pre_base_learner.parameters());
        params
    }

    fn embed(&self, encoder: &B, input: &Tensor) -> Tensor {
        let embedding = encoder.embed(input);
        match self.mode {
            Mode::Train => embedding,
            Mode::Eval => embedding.detach(),
        }
    }

    fn keep_graph(&self) -> bool {
        self.mode == Mode::Train
    }

    /// `meta_evidence + w * pre_evidence`
    fn combine(&self, meta: &Tensor, pre: &Tensor) -> Tensor {
        add(meta, &scale(pre, self.settings.pretrain_evidence_weight))
    }

    /// Adapt both heads on the support set and return the combined query evidence
    pub fn meta_forward(
        &self,
        support: &Tensor,
        support_labels: &[usize],
        query: &Tensor,
    ) -> Result<Tensor> {
        let s = &self.settings;
        let keep = self.keep_graph();

        let meta_evidence = self.meta_base_learner.adapt_and_predict(
            &self.embed(&self.encoder, support),
            support_labels,
            &self.embed(&self.encoder, query),
            s.update_step,
            s.meta_base_lr,
            keep,
        )?;
        let pre_evidence = self.pre_base_learner.adapt_and_predict(
            &self.embed(&self.pre_encoder, support),
            support_labels,
            &self.embed(&self.pre_encoder, query),
            s.update_step,
            s.pre_base_lr,
            keep,
        )?;
        Ok(self.combine(&meta_evidence, &pre_evidence))
    }

    /// Adapt once on the in-distribution support set, then predict both the
    /// in-distribution query and the OOD query with the same adapted heads
    pub fn ood_forward(
        &self,
        support: &Tensor,
        support_labels: &[usize],
        query: &Tensor,
        ood_query: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        let s = &self.settings;
        let keep = self.keep_graph();

        let meta = self.meta_base_learner.adapt(
            &self.embed(&self.encoder, support),
            support_labels,
            s.update_step,
            s.meta_base_lr,
            keep,
        )?;
        let pre = self.pre_base_learner.adapt(
            &self.embed(&self.pre_encoder, support),
            support_labels,
            s.update_step,
            s.pre_base_lr,
            keep,
        )?;

        let predict = |input: &Tensor| {
            let meta_evidence = self
                .meta_base_learner
                .evidence(&self.embed(&self.encoder, input), &meta);
            let pre_evidence = self
                .pre_base_learner
                .evidence(&self.embed(&self.pre_encoder, input), &pre);
            self.combine(&meta_evidence, &pre_evidence)
        };
        Ok((predict(query), predict(ood_query)))
    }

    /// Load every parameter from `state`; any missing key is an error
    ///
    /// The model is only written once the whole checkpoint has been checked.
    pub fn load_state_dict(&self, state: &StateDict, origin: &Path) -> Result<()> {
        let missing = self.check_state(state)?;
        if !missing.is_empty() {
            return Err(MtedlError::CheckpointMismatch {
                path: origin.to_path_buf(),
                missing,
            });
        }
        self.load_matching(state)?;
        Ok(())
    }

    /// Load an encoder-only checkpoint into both `encoder.` and `pre_encoder.`
    ///
    /// Keys absent from this model are dropped. Returns the number of
    /// parameters overwritten.
    pub fn load_pretrained_encoder(&self, pretrained: &StateDict) -> Result<usize> {
        let target = self.state_dict();
        let mut merged = filter_with_prefix(pretrained, "encoder.", &target);
        merged.extend(filter_with_prefix(pretrained, "pre_encoder.", &target));
        let loaded = merged.len();
        self.load_matching(&merged)?;
        debug!(
            loaded,
            available = pretrained.len(),
            "loaded pretrained encoder weights"
        );
        Ok(loaded)
    }
}

impl<B: Backbone> Module for MtlLearner<B> {
    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = prefixed("encoder.", self.encoder.named_parameters());
        params.extend(prefixed("pre_encoder.", self.pre_encoder.named_parameters()));
        params.extend(prefixed(
            "meta_base_learner.",
            self.meta_base_learner.named_parameters(),
        ));
        params.extend(prefixed(
            "pre_base_learner.",
            self.pre_base_learner.named_parameters(),
        ));
        params
    }
}
