//! Validation error types

use mtedl_common::MtedlError;

/// Validation error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid {field}: {value} (must be > 0)")]
    NonPositiveCount { field: &'static str, value: usize },

    #[error("Invalid learning rate {field}: {value} (must be > 0.0 and finite)")]
    InvalidLearningRate { field: &'static str, value: f32 },

    #[error("Invalid decay factor {field}: {value} (must be in (0.0, 1.0])")]
    InvalidGamma { field: &'static str, value: f32 },

    #[error("Invalid {field}: {value} (must be >= 0.0)")]
    Negative { field: &'static str, value: f32 },

    #[error("Invalid annealing_step: 0 (must be > 0)")]
    ZeroAnnealingStep,

    #[error("Phase '{0}' is not supported")]
    UnsupportedPhase(String),

    #[error("Encoder layer widths must be > 0")]
    EmptyEncoderLayer,
}

impl ValidationError {
    /// Name of the offending option
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonPositiveCount { field, .. }
            | Self::InvalidLearningRate { field, .. }
            | Self::InvalidGamma { field, .. }
            | Self::Negative { field, .. } => field,
            Self::ZeroAnnealingStep => "annealing_step",
            Self::UnsupportedPhase(_) => "phase",
            Self::EmptyEncoderLayer => "encoder",
        }
    }

    fn suggestion(&self) -> &'static str {
        match self {
            Self::NonPositiveCount { .. } => "Use a positive integer",
            Self::InvalidLearningRate { .. } => "Typical values: meta_lr1 1e-4, meta_lr2 1e-3, base_lr 1e-2",
            Self::InvalidGamma { .. } => "Use a factor such as 0.5 (halve) or 1.0 (no decay)",
            Self::Negative { .. } => "Use 0 to disable the term",
            Self::ZeroAnnealingStep => "Leave annealing_step unset to use 5 * max_epoch",
            Self::UnsupportedPhase(_) => {
                "Use one of: pre_train, meta_train, meta_eval, OOD_test, threshold_test"
            }
            Self::EmptyEncoderLayer => "Give every hidden layer and the embedding a width",
        }
    }
}

impl From<ValidationError> for MtedlError {
    fn from(err: ValidationError) -> Self {
        MtedlError::config(err.field(), err.to_string(), err.suggestion())
    }
}
