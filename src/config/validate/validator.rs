//! Configuration validation logic
//!
//! Validates experiment configurations before any data is touched.

use super::error::ValidationError;
use crate::config::schema::{ExperimentConfig, Phase};

fn positive(field: &'static str, value: usize) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NonPositiveCount { field, value });
    }
    Ok(())
}

fn learning_rate(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(ValidationError::InvalidLearningRate { field, value });
    }
    Ok(())
}

fn decay(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ValidationError::InvalidGamma { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if !(value >= 0.0 && value.is_finite()) {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// Validate an experiment configuration
///
/// Checks:
/// - Counts (way, shot, queries, batches, epochs) are positive
/// - Learning rates are positive, decay factors lie in (0, 1]
/// - The phase is runnable
pub fn validate_config(config: &ExperimentConfig) -> Result<(), ValidationError> {
    if config.phase == Phase::Active {
        return Err(ValidationError::UnsupportedPhase(config.phase.to_string()));
    }

    for (field, value) in [
        ("way", config.way),
        ("shot", config.shot),
        ("train_query", config.train_query),
        ("val_query", config.val_query),
        ("query", config.query),
        ("train_num_batch", config.train_num_batch),
        ("val_num_batch", config.val_num_batch),
        ("task_num", config.task_num),
        ("max_epoch", config.max_epoch),
        ("pre_max_epoch", config.pre_max_epoch),
        ("pre_batch_size", config.pre_batch_size),
    ] {
        positive(field, value)?;
    }

    for (field, value) in [
        ("meta_lr1", config.meta_lr1),
        ("meta_lr2", config.meta_lr2),
        ("meta_base_lr", config.meta_base_lr),
        ("pre_base_lr", config.pre_base_lr),
        ("base_lr", config.base_lr),
        ("pre_lr", config.pre_lr),
    ] {
        learning_rate(field, value)?;
    }

    decay("gamma", config.gamma)?;
    decay("pre_gamma", config.pre_gamma)?;
    non_negative("pretrain_evidence_weight", config.pretrain_evidence_weight)?;
    non_negative("pre_custom_momentum", config.pre_custom_momentum)?;
    non_negative("pre_custom_weight_decay", config.pre_custom_weight_decay)?;

    if config.annealing_step == Some(0) {
        return Err(ValidationError::ZeroAnnealingStep);
    }

    if config.encoder.embedding_dim == 0 || config.encoder.hidden.contains(&0) {
        return Err(ValidationError::EmptyEncoderLayer);
    }

    Ok(())
}
