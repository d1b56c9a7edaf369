//! Shared infrastructure for mtedl.
//!
//! - Error taxonomy with actionable diagnostics and stable error codes
//! - Running statistics (mean, std, 95% confidence interval) for episode loops

pub mod error;
pub mod stats;

pub use error::{MtedlError, Result};
pub use stats::{compute_confidence_interval, summarize, Averager, RunningStats, Summary};
