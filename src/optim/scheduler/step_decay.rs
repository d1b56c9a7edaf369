//! Step decay learning rate scheduler

use super::LRScheduler;
use crate::optim::{Optimizer, ParamGroups};

/// Step Decay Learning Rate Scheduler
///
/// Multiplies learning rate by gamma every step_size epochs.
///
/// Formula: lr_t = lr_initial * gamma^(floor(epoch / step_size))
#[derive(Debug, Clone)]
pub struct StepDecayLR {
    lr_initial: f32,
    gamma: f32,
    step_size: usize,
    current_epoch: usize,
}

impl StepDecayLR {
    /// Create a new step decay scheduler
    ///
    /// # Arguments
    /// * `lr_initial` - Initial learning rate
    /// * `step_size` - Decay LR every step_size epochs
    /// * `gamma` - Multiplicative factor (e.g., 0.1 for 10x reduction)
    pub fn new(lr_initial: f32, step_size: usize, gamma: f32) -> Self {
        Self { lr_initial, gamma, step_size, current_epoch: 0 }
    }

    /// Scheduler that only tracks the decay factor, for parameter groups
    /// that each carry their own base rate
    pub fn factor_only(step_size: usize, gamma: f32) -> Self {
        Self::new(1.0, step_size, gamma)
    }

    /// `gamma^(floor(epoch / step_size))`
    pub fn factor(&self) -> f32 {
        if self.step_size == 0 {
            return 1.0;
        }
        let num_decays = self.current_epoch / self.step_size;
        self.gamma.powi(num_decays as i32)
    }

    pub fn epoch(&self) -> usize {
        self.current_epoch
    }

    /// Apply the current learning rate to an optimizer
    pub fn apply<O: Optimizer + ?Sized>(&self, optimizer: &mut O) {
        optimizer.set_lr(self.get_lr());
    }

    /// Scale every group's base learning rate by the current factor
    pub fn apply_groups(&self, groups: &mut ParamGroups) {
        groups.set_lr_factor(self.factor());
    }
}

impl LRScheduler for StepDecayLR {
    fn get_lr(&self) -> f32 {
        self.lr_initial * self.factor()
    }

    fn step(&mut self) {
        self.current_epoch += 1;
    }
}
