//! Evaluation metrics for training and validation
//!
//! - Classification: `count_acc`, `acc_with_threshold`, `nll`
//! - Calibration: `expected_calibration_error`

mod calibration;
mod classification;


pub use calibration::{expected_calibration_error, ECE_BINS};
pub use classification::{acc_with_threshold, count_acc, nll, predictions};
