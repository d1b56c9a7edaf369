//! Error taxonomy with actionable diagnostics.
//!
//! Every variant carries enough context to act on without reading the code:
//! which option is wrong, which class ran short, which checkpoint key is missing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mtedl operations.
pub type Result<T> = std::result::Result<T, MtedlError>;

/// Errors raised while configuring, training or evaluating a model.
#[derive(Error, Debug)]
pub enum MtedlError {
    /// Unsupported option combination, or shot/way larger than the data allows.
    #[error("Invalid configuration for '{field}': {message}\n  → {suggestion}")]
    Configuration {
        field: String,
        message: String,
        suggestion: String,
    },

    /// The episodic sampler could not draw enough items for a selected class.
    #[error("Class {class} has {available} items but {required} are needed per episode\n  → Lower shot/query or drop sparse classes from the pool")]
    InsufficientSamples {
        class: usize,
        available: usize,
        required: usize,
    },

    /// A checkpoint lacks parameters that the current model structure needs.
    #[error("Checkpoint {path} is missing {} parameter(s), first: '{}'\n  → Load with key-prefix filtering or retrain the checkpoint", missing.len(), missing.first().map(String::as_str).unwrap_or("?"))]
    CheckpointMismatch { path: PathBuf, missing: Vec<String> },

    /// NaN or Inf detected in a loss or evidence tensor.
    #[error("Numerical instability in {stage} at epoch {epoch}, task {task}: {value}\n  → Lower the learning rates or switch loss_type")]
    UnstableTraining {
        stage: String,
        epoch: usize,
        task: usize,
        value: f32,
    },

    /// A metric is undefined for a degenerate input (e.g. a single-class ROC).
    #[error("Metric '{metric}' is undefined: {reason}")]
    UndefinedMetric { metric: String, reason: String },

    /// Two tensors or label vectors disagree on their leading dimension.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl MtedlError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(
        field: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error must abort the current run.
    ///
    /// Only undefined metrics are absorbed: the task is flagged and the loop moves on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UndefinedMetric { .. })
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "E001",
            Self::InsufficientSamples { .. } => "E010",
            Self::CheckpointMismatch { .. } => "E020",
            Self::UnstableTraining { .. } => "E030",
            Self::UndefinedMetric { .. } => "E040",
            Self::ShapeMismatch { .. } => "E050",
            Self::Io { .. } => "E060",
            Self::Serialization { .. } => "E061",
        }
    }
}
