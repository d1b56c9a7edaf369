//! Stochastic Gradient Descent optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array2;

/// SGD optimizer with optional momentum, Nesterov momentum and L2 weight decay
///
/// d = g + λθ; b = μb + d (b = d on the first step);
/// θ -= lr * (d + μb) with Nesterov, θ -= lr * b otherwise.
pub struct SGD {
    lr: f32,
    momentum: f32,
    nesterov: bool,
    weight_decay: f32,
    velocities: Vec<Option<Array2<f32>>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            nesterov: false,
            weight_decay: 0.0,
            velocities: Vec::new(),
        }
    }

    pub fn with_nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Initialize velocities if needed
    fn ensure_velocities(&mut self, params: &[Tensor]) {
        if self.velocities.len() < params.len() {
            self.velocities.resize(params.len(), None);
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &[Tensor]) {
        self.ensure_velocities(params);

        for (i, param) in params.iter().enumerate() {
            let Some(mut grad) = param.grad() else {
                continue;
            };
            if self.weight_decay != 0.0 {
                grad.scaled_add(self.weight_decay, &*param.data());
            }

            let update = if self.momentum > 0.0 {
                let velocity = match self.velocities[i].take() {
                    Some(v) => v * self.momentum + &grad,
                    None => grad.clone(),
                };
                let update = if self.nesterov {
                    &grad + &(&velocity * self.momentum)
                } else {
                    velocity.clone()
                };
                self.velocities[i] = Some(velocity);
                update
            } else {
                grad
            };

            param.data_mut().scaled_add(-self.lr, &update);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn param(value: f32, grad: f32) -> Tensor {
        let p = Tensor::from_vec(1, 1, vec![value], true);
        p.set_grad(arr2(&[[grad]]));
        p
    }

    #[test]
    fn test_plain_sgd() {
        let mut opt = SGD::new(0.1, 0.0);
        let p = param(1.0, 2.0);
        opt.step(&[p.clone()]);
        assert_abs_diff_eq!(p.item(), 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_momentum_accumulates() {
        let mut opt = SGD::new(0.1, 0.9);
        let p = param(0.0, 1.0);
        opt.step(&[p.clone()]); // b = 1
        opt.step(&[p.clone()]); // b = 1.9
        assert_abs_diff_eq!(p.item(), -0.29, epsilon = 1e-6);
    }

    #[test]
    fn test_nesterov_looks_ahead() {
        let mut opt = SGD::new(0.1, 0.9).with_nesterov(true);
        let p = param(0.0, 1.0);
        opt.step(&[p.clone()]); // b = 1, update = 1 + 0.9
        assert_abs_diff_eq!(p.item(), -0.19, epsilon = 1e-6);
    }

    #[test]
    fn test_weight_decay_adds_l2_term() {
        let mut opt = SGD::new(0.1, 0.0).with_weight_decay(0.5);
        let p = param(2.0, 0.0);
        opt.step(&[p.clone()]);
        assert_abs_diff_eq!(p.item(), 1.9, epsilon = 1e-6);
    }
}
