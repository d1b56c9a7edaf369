//! Parameter groups with independent learning rates

use super::Optimizer;
use crate::Tensor;

/// One set of parameters driven by its own optimizer
pub struct ParamGroup {
    pub name: String,
    pub params: Vec<Tensor>,
    base_lr: f32,
    optimizer: Box<dyn Optimizer>,
}

impl ParamGroup {
    pub fn base_lr(&self) -> f32 {
        self.base_lr
    }

    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }
}

/// Ordered parameter groups stepped together
///
/// The meta learner puts the encoder and the two heads in separate groups so
/// they train at `meta_lr1` and `meta_lr2`.
#[derive(Default)]
pub struct ParamGroups {
    groups: Vec<ParamGroup>,
}

impl ParamGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group; its base rate is the optimizer's current rate
    pub fn push(
        &mut self,
        name: impl Into<String>,
        params: Vec<Tensor>,
        optimizer: Box<dyn Optimizer>,
    ) {
        self.groups.push(ParamGroup {
            name: name.into(),
            params,
            base_lr: optimizer.lr(),
            optimizer,
        });
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    pub fn step(&mut self) {
        for group in &mut self.groups {
            group.optimizer.step(&group.params);
        }
    }

    pub fn zero_grad(&mut self) {
        for group in &mut self.groups {
            group.optimizer.zero_grad(&group.params);
        }
    }

    /// Current learning rate of every group, in insertion order
    pub fn lrs(&self) -> Vec<f32> {
        self.groups.iter().map(ParamGroup::lr).collect()
    }

    /// Set each group's rate to `base_lr * factor`
    pub fn set_lr_factor(&mut self, factor: f32) {
        for group in &mut self.groups {
            group.optimizer.set_lr(group.base_lr * factor);
        }
    }

    /// Every parameter across all groups
    pub fn params(&self) -> Vec<Tensor> {
        self.groups.iter().flat_map(|g| g.params.iter().cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::SGD;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    #[test]
    fn test_groups_step_with_their_own_rate() {
        let a = Tensor::from_vec(1, 1, vec![1.0], true);
        let b = Tensor::from_vec(1, 1, vec![1.0], true);
        a.set_grad(arr2(&[[1.0]]));
        b.set_grad(arr2(&[[1.0]]));

        let mut groups = ParamGroups::new();
        groups.push("slow", vec![a.clone()], Box::new(SGD::new(0.01, 0.0)));
        groups.push("fast", vec![b.clone()], Box::new(SGD::new(0.1, 0.0)));
        groups.step();

        assert_abs_diff_eq!(a.item(), 0.99, epsilon = 1e-6);
        assert_abs_diff_eq!(b.item(), 0.9, epsilon = 1e-6);
        assert_eq!(groups.params().len(), 2);

        groups.zero_grad();
        assert!(a.grad().is_none() && b.grad().is_none());
    }

    #[test]
    fn test_lr_factor_is_relative_to_base() {
        let mut groups = ParamGroups::new();
        groups.push("only", Vec::new(), Box::new(SGD::new(0.2, 0.0)));
        groups.set_lr_factor(0.5);
        groups.set_lr_factor(0.5);
        assert_abs_diff_eq!(groups.lrs()[0], 0.1, epsilon = 1e-7);
        assert_abs_diff_eq!(groups.groups()[0].base_lr(), 0.2, epsilon = 1e-7);
    }
}
