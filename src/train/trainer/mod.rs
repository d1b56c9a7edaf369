//! Episodic trainers
//!
//! - [`MetaTrainer`]: outer-loop training of the meta-transfer learner with
//!   validation, checkpointing and a per-epoch history
//! - [`PreTrainer`]: supervised warm start of the encoder over all base classes

mod meta;
mod pre;
mod result;

pub use meta::MetaTrainer;
pub use pre::PreTrainer;
pub use result::TrainResult;

use crate::autograd::Tensor;
use crate::edl::{dirichlet_alpha, EvidentialLoss};
use mtedl_common::{MtedlError, Result};

/// Epoch reminders and timing reports are logged at this period
pub(crate) const REPORT_EVERY: usize = 10;

/// Fail with [`MtedlError::UnstableTraining`] on the first NaN or infinity
pub(crate) fn ensure_finite(tensor: &Tensor, stage: &str, epoch: usize, task: usize) -> Result<()> {
    let data = tensor.data();
    match data.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(MtedlError::UnstableTraining {
            stage: stage.to_string(),
            epoch,
            task,
            value,
        }),
        None => Ok(()),
    }
}

/// Dirichlet parameters and evidential loss of a query set
///
/// Both the evidence and the loss must be finite.
pub(crate) fn query_loss(
    loss_fn: &EvidentialLoss,
    evidence: &Tensor,
    labels: &[usize],
    epoch: usize,
    task: usize,
) -> Result<(Tensor, Tensor)> {
    ensure_finite(evidence, "evidence", epoch, task)?;
    let alpha = dirichlet_alpha(evidence);
    let loss = loss_fn.compute(&alpha, labels)?;
    ensure_finite(&loss, "loss", epoch, task)?;
    Ok((alpha, loss))
}
