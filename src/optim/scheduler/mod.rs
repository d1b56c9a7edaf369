//! Learning rate schedulers
//!
//! `StepDecayLR` multiplies the learning rate by a factor every N epochs. It is
//! stepped once per epoch by the trainers.

mod step_decay;

#[cfg(test)]
mod tests;

pub use step_decay::StepDecayLR;

/// Learning rate scheduler trait
pub trait LRScheduler {
    /// Get the current learning rate
    fn get_lr(&self) -> f32;

    /// Step the scheduler (typically called after each epoch or batch)
    fn step(&mut self);
}
