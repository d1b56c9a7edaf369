//! Evaluation of a meta-trained learner
//!
//! ## Architecture
//!
//! - `roc`: rank-based ROC-AUC with tie handling
//! - `ood`: paired in-distribution / OOD tasks scored by Dirichlet uncertainty
//! - `meta_eval`: test-split accuracy and calibration, thresholded accuracy
//! - `threshold`: accuracy of predictions kept under an uncertainty threshold
//!
//! ## Example
//!
//! ```
//! use mtedl::eval::score_ood_task;
//! use ndarray::Array2;
//!
//! let in_alpha = Array2::from_shape_fn((4, 2), |(r, c)| if c == r % 2 { 30.0 } else { 1.0 });
//! let ood_alpha = Array2::from_elem((4, 2), 1.1);
//! let scores = score_ood_task(&in_alpha, &ood_alpha);
//! assert_eq!(scores.precision, 1.0);
//! ```

mod meta_eval;
mod ood;
mod roc;
mod threshold;

pub use meta_eval::{MetaEvalReport, MetaEvaluator};
pub use ood::{assess_ood_task, score_ood_task, OodAggregate, OodEvaluator, OodReport, OodTaskScores};
pub use roc::{roc_auc, try_roc_auc};
pub use threshold::{default_thresholds, ThresholdAccumulator, ThresholdRow};
