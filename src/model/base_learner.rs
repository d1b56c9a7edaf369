//! Linear evidential head with inner-loop adaptation
//!
//! Adaptation never mutates the stored head. Each gradient step produces a new
//! [`HeadParams`] snapshot computed from the previous one; when the graph is
//! kept, the final snapshot is a differentiable function of the stored weights,
//! so an outer loss on the query evidence backpropagates through every step.

use super::EvidenceActivation;
use crate::autograd::{
    add_scalar, broadcast_to, div, grad, ln, mul, scale, sub, sum, sum_cols, Tensor,
};
use crate::edl::one_hot;
use crate::nn::{linear, Linear, Module};
use mtedl_common::{MtedlError, Result};
use rand::Rng;

/// Weight (`embedding_dim x way`) and bias (`1 x way`) of a head
#[derive(Debug, Clone)]
pub struct HeadParams {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl HeadParams {
    pub fn logits(&self, embeddings: &Tensor) -> Tensor {
        linear(embeddings, &self.weight, &self.bias)
    }

    pub fn tensors(&self) -> Vec<Tensor> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    /// `theta - step_size * grad` as a new snapshot
    pub fn step(&self, grads: &[Tensor], step_size: f32) -> Self {
        Self {
            weight: sub(&self.weight, &scale(&grads[0], step_size)),
            bias: sub(&self.bias, &scale(&grads[1], step_size)),
        }
    }

    /// Fresh gradient-tracking leaves with the same values, outside any graph
    pub fn detached_leaves(&self) -> Self {
        Self {
            weight: Tensor::new(self.weight.to_array(), true),
            bias: Tensor::new(self.bias.to_array(), true),
        }
    }
}

/// Linear head mapping embeddings to per-class evidence
pub struct BaseLearner {
    head: Linear,
    activation: EvidenceActivation,
}

impl BaseLearner {
    pub fn new(head: Linear, activation: EvidenceActivation) -> Self {
        Self { head, activation }
    }

    /// Randomly initialized `embedding_dim -> way` head
    pub fn with_dims<R: Rng>(
        embedding_dim: usize,
        way: usize,
        activation: EvidenceActivation,
        rng: &mut R,
    ) -> Self {
        Self::new(Linear::new(embedding_dim, way, rng), activation)
    }

    pub fn way(&self) -> usize {
        self.head.out_features()
    }

    pub fn activation(&self) -> EvidenceActivation {
        self.activation
    }

    /// The stored parameters (aliasing the leaves the optimizer updates)
    pub fn params(&self) -> HeadParams {
        HeadParams {
            weight: self.head.weight.clone(),
            bias: self.head.bias.clone(),
        }
    }

    pub fn evidence(&self, embeddings: &Tensor, params: &HeadParams) -> Tensor {
        self.activation.apply(&params.logits(embeddings))
    }

    /// Evidence under the stored parameters
    pub fn forward(&self, embeddings: &Tensor) -> Tensor {
        self.evidence(embeddings, &self.params())
    }

    /// Cross-entropy of the Dirichlet mean `alpha / S` against `labels`
    pub fn inner_loss(
        &self,
        embeddings: &Tensor,
        labels: &[usize],
        params: &HeadParams,
    ) -> Result<Tensor> {
        if embeddings.rows() != labels.len() {
            return Err(MtedlError::ShapeMismatch {
                context: "support embeddings vs labels".into(),
                expected: vec![labels.len()],
                actual: vec![embeddings.rows()],
            });
        }
        let alpha = add_scalar(&self.evidence(embeddings, params), 1.0);
        let (n, k) = alpha.shape();
        let prob = div(&alpha, &broadcast_to(&sum_cols(&alpha), n, k));
        let y = one_hot(labels, k)?;
        Ok(scale(&sum(&mul(&y, &ln(&prob))), -1.0 / n.max(1) as f32))
    }

    /// Adapt a copy of the head on the support set, returning the final
    /// snapshot and the inner loss before every step
    ///
    /// With `create_graph` the trajectory stays differentiable w.r.t. the stored
    /// parameters (and anything the support embeddings depend on). Without it each
    /// step starts from detached leaves and the graph never grows.
    pub fn adapt_with_trace(
        &self,
        support: &Tensor,
        labels: &[usize],
        num_steps: usize,
        step_size: f32,
        create_graph: bool,
    ) -> Result<(HeadParams, Vec<f32>)> {
        if support.rows() != labels.len() {
            return Err(MtedlError::ShapeMismatch {
                context: "support embeddings vs labels".into(),
                expected: vec![labels.len()],
                actual: vec![support.rows()],
            });
        }

        let attached = create_graph && self.head.weight.requires_grad();
        let mut params = if attached {
            self.params()
        } else {
            self.params().detached_leaves()
        };
        let support = if attached { support.clone() } else { support.detach() };

        let mut trace = Vec::with_capacity(num_steps);
        for _ in 0..num_steps {
            let loss = self.inner_loss(&support, labels, &params)?;
            trace.push(loss.item());
            let grads = grad(&loss, &params.tensors(), attached);
            params = params.step(&grads, step_size);
            if !attached {
                params = params.detached_leaves();
            }
        }
        Ok((params, trace))
    }

    pub fn adapt(
        &self,
        support: &Tensor,
        labels: &[usize],
        num_steps: usize,
        step_size: f32,
        create_graph: bool,
    ) -> Result<HeadParams> {
        self.adapt_with_trace(support, labels, num_steps, step_size, create_graph)
            .map(|(params, _)| params)
    }

    /// Adapt on the support set, then return the query evidence
    pub fn adapt_and_predict(
        &self,
        support: &Tensor,
        labels: &[usize],
        query: &Tensor,
        num_steps: usize,
        step_size: f32,
        create_graph: bool,
    ) -> Result<Tensor> {
        let params = self.adapt(support, labels, num_steps, step_size, create_graph)?;
        Ok(self.evidence(query, &params))
    }
}

impl Module for BaseLearner {
    fn named_parameters(&self) -> Vec<(String, Tensor)> {
        self.head.named_parameters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{backward, mean};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn learner() -> BaseLearner {
        let mut rng = StdRng::seed_from_u64(11);
        BaseLearner::with_dims(4, 3, EvidenceActivation::Softplus, &mut rng)
    }

    fn support() -> (Tensor, Vec<usize>) {
        // one clearly separated prototype per class, rank-major layout
        let x = Tensor::from_vec(
            6,
            4,
            vec![
                2.0, 0.0, 0.0, 0.0, //
                0.0, 2.0, 0.0, 0.0, //
                0.0, 0.0, 2.0, 0.0, //
                1.8, 0.1, 0.0, 0.0, //
                0.1, 1.9, 0.0, 0.1, //
                0.0, 0.1, 2.1, 0.0,
            ],
            false,
        );
        (x, vec![0, 1, 2, 0, 1, 2])
    }

    #[test]
    fn test_zero_steps_is_identity() {
        let base = learner();
        let (x, y) = support();
        let adapted = base.adapt_and_predict(&x, &y, &x, 0, 0.5, true).unwrap();
        assert_eq!(adapted.to_array(), base.forward(&x).to_array());
    }

    #[test]
    fn test_inner_loop_reduces_loss_without_touching_stored_params() {
        let base = learner();
        let before = base.state_dict();
        let (x, y) = support();
        let (_, trace) = base.adapt_with_trace(&x, &y, 30, 0.5, false).unwrap();
        assert_eq!(trace.len(), 30);
        assert!(trace.last().unwrap() < &trace[0]);
        assert_eq!(base.state_dict(), before);
    }

    #[test]
    fn test_mismatched_support_is_error() {
        let base = learner();
        let (x, _) = support();
        let err = base.adapt(&x, &[0, 1, 2], 1, 0.1, false).unwrap_err();
        assert!(matches!(err, MtedlError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_detached_adaptation_has_no_graph_to_stored_params() {
        let base = learner();
        let (x, y) = support();
        let ev = base.adapt_and_predict(&x, &y, &x, 3, 0.1, false).unwrap();
        backward(&mean(&ev), None);
        assert!(base.params().weight.grad().is_none());
    }

    #[test]
    fn test_outer_gradient_flows_through_trajectory() {
        let base = learner();
        let (x, y) = support();
        let ev = base.adapt_and_predict(&x, &y, &x, 3, 0.1, true).unwrap();
        backward(&mean(&ev), None);
        let g = base.params().weight.grad().unwrap();
        assert!(g.iter().any(|v| v.abs() > 0.0));
    }

    #[test]
    fn test_second_order_gradient_matches_finite_difference() {
        // d/dW0 of mean(evidence(query; W_1(W0))) after one inner step
        let base = learner();
        let (x, y) = support();
        let step = 0.3;
        let outer = |b: &BaseLearner| -> f32 {
            let ev = b.adapt_and_predict(&x, &y, &x, 1, step, false).unwrap();
            let value = mean(&ev).item();
            value
        };

        let ev = base.adapt_and_predict(&x, &y, &x, 1, step, true).unwrap();
        backward(&mean(&ev), None);
        let analytic = base.params().weight.grad().unwrap();

        let eps = 1e-2;
        for (r, c) in [(0, 0), (1, 2), (3, 1)] {
            let original = base.params().weight.data()[[r, c]];
            base.params().weight.data_mut()[[r, c]] = original + eps;
            let plus = outer(&base);
            base.params().weight.data_mut()[[r, c]] = original - eps;
            let minus = outer(&base);
            base.params().weight.data_mut()[[r, c]] = original;
            let numeric = (plus - minus) / (2.0 * eps);
            assert_abs_diff_eq!(analytic[[r, c]], numeric, epsilon = 2e-3);
        }
    }
}
