//! Configuration validation
//!
//! Validates experiment configurations for correctness before execution.

mod error;
mod validator;


pub use error::ValidationError;
pub use validator::validate_config;
