//! Adam optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array2;

/// Adam optimizer
///
/// m_t = β1 m + (1 - β1) g, v_t = β2 v + (1 - β2) g²,
/// θ_t = θ - lr * m̂_t / (√v̂_t + ε) with bias-corrected moments.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<Array2<f32>>>, // First moment
    v: Vec<Option<Array2<f32>>>, // Second moment
}

impl Adam {
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Adam with β1 = 0.9, β2 = 0.999, ε = 1e-8
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    fn ensure_moments(&mut self, params: &[Tensor]) {
        if self.m.len() < params.len() {
            self.m.resize(params.len(), None);
            self.v.resize(params.len(), None);
        }
    }

    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &[Tensor]) {
        self.ensure_moments(params);
        self.t += 1;
        let t = self.t as i32;
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);

        for (i, param) in params.iter().enumerate() {
            let Some(grad) = param.grad() else {
                continue;
            };

            let m = match self.m[i].take() {
                Some(m) => m * self.beta1 + &grad * (1.0 - self.beta1),
                None => &grad * (1.0 - self.beta1),
            };
            let v = match self.v[i].take() {
                Some(v) => v * self.beta2 + grad.mapv(|g| g * g) * (1.0 - self.beta2),
                None => grad.mapv(|g| g * g) * (1.0 - self.beta2),
            };

            let lr = self.lr;
            let eps = self.epsilon;
            {
                let mut data = param.data_mut();
                ndarray::Zip::from(&mut *data)
                    .and(&m)
                    .and(&v)
                    .for_each(|p, &m, &v| {
                        *p -= lr * (m / bias1) / ((v / bias2).sqrt() + eps);
                    });
            }
            self.m[i] = Some(m);
            self.v[i] = Some(v);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
