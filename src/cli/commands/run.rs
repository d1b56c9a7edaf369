//! Run command: builds datasets and learners for the configured phase

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, read_config, validate_config, ExperimentConfig, Phase, RunArgs};
use crate::data::{Dataset, FeatureDataset, Split};
use crate::eval::{MetaEvaluator, OodEvaluator};
use crate::io::load_state_dict;
use crate::model::MtlLearner;
use crate::nn::MlpBackbone;
use crate::train::{MetaTrainer, PreTrainer};
use mtedl_common::{MtedlError, Result};
use rand::Rng;
use tracing::{info, warn};

/// Encoder family accepted in `model_type`
const MLP_MODEL: &str = "MLP";

pub fn run_run(args: RunArgs, level: LogLevel) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = read_config(path)?;
            if let Some(dir) = path.parent() {
                config.resolve_paths(dir);
            }
            config
        }
        None => ExperimentConfig::default(),
    };
    apply_overrides(&mut config, &args);
    validate_config(&config)?;

    if args.dry_run {
        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| MtedlError::serialization(format!("YAML serialization error: {e}")))?;
        log(level, LogLevel::Normal, "Dry run, resolved configuration:");
        println!("{yaml}");
        return Ok(());
    }

    run_phase(config)
}

/// Run a validated configuration
pub fn run_phase(config: ExperimentConfig) -> Result<()> {
    info!(
        phase = %config.phase,
        dataset = %config.dataset,
        way = config.way,
        shot = config.shot,
        "starting"
    );
    match config.phase {
        Phase::PreTrain => pretrain(config),
        Phase::MetaTrain => meta_train(config),
        Phase::MetaEval => meta_eval(config),
        Phase::OodTest => ood_test(config),
        Phase::ThresholdTest => threshold_test(config),
        Phase::Active => Err(MtedlError::config(
            "phase",
            "the active phase is not implemented",
            "Use pre_train, meta_train, meta_eval, OOD_test or threshold_test",
        )),
    }
}

fn open_split(config: &ExperimentConfig, split: Split) -> Result<FeatureDataset> {
    let dataset = FeatureDataset::load(&config.dataset_path(split))?;
    info!(
        split = %split,
        items = dataset.len(),
        classes = dataset.num_classes(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn build_encoder<R: Rng>(config: &ExperimentConfig, input_dim: usize, rng: &mut R) -> Result<MlpBackbone> {
    if config.model_type != MLP_MODEL {
        return Err(MtedlError::config(
            "model_type",
            format!("unknown encoder '{}'", config.model_type),
            format!("Use {MLP_MODEL}"),
        ));
    }
    Ok(MlpBackbone::new(
        input_dim,
        &config.encoder.hidden,
        config.encoder.embedding_dim,
        rng,
    ))
}

fn build_learner(config: &ExperimentConfig, input_dim: usize) -> Result<MtlLearner<MlpBackbone>> {
    let mut rng = config.rng();
    let encoder = build_encoder(config, input_dim, &mut rng)?;
    Ok(MtlLearner::new(encoder, config.learner_settings(), &mut rng))
}

/// Learner with the meta-trained weights, strictly loaded
fn load_meta_learner(config: &ExperimentConfig, input_dim: usize) -> Result<MtlLearner<MlpBackbone>> {
    let learner = build_learner(config, input_dim)?;
    let path = config.meta_checkpoint_path();
    let state = load_state_dict(&path)?;
    learner.load_state_dict(&state, &path)?;
    info!(checkpoint = %path.display(), "meta-trained weights loaded");
    Ok(learner)
}

fn pretrain(config: ExperimentConfig) -> Result<()> {
    let trainset = open_split(&config, Split::Train)?;
    let valset = open_split(&config, Split::Val)?;
    let encoder = build_encoder(&config, trainset.feature_dim(), &mut config.rng())?;
    let result = PreTrainer::new(config, encoder, trainset, valset)?.train()?;
    info!(
        max_acc = result.max_acc,
        max_acc_epoch = result.max_acc_epoch,
        save_dir = %result.save_dir.display(),
        "pretraining finished"
    );
    Ok(())
}

fn meta_train(config: ExperimentConfig) -> Result<()> {
    let trainset = open_split(&config, Split::Train)?;
    let valset = open_split(&config, Split::Val)?;
    let learner = build_learner(&config, trainset.feature_dim())?;

    let path = config.pretrain_checkpoint_path();
    if path.exists() {
        let loaded = learner.load_pretrained_encoder(&load_state_dict(&path)?)?;
        info!(checkpoint = %path.display(), loaded, "pretrained encoder loaded");
    } else if config.pretrain_checkpoint.is_some() {
        return Err(MtedlError::io(
            format!("pretrained checkpoint {}", path.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    } else {
        warn!(
            checkpoint = %path.display(),
            "no pretrained encoder found, meta-training from a random initialization"
        );
    }

    MetaTrainer::new(config, learner, trainset, valset)?.train()?;
    Ok(())
}

fn meta_eval(config: ExperimentConfig) -> Result<()> {
    let testset = open_split(&config, Split::Test)?;
    let learner = load_meta_learner(&config, testset.feature_dim())?;
    MetaEvaluator::new(&config, learner, testset)?.run()?;
    Ok(())
}

fn threshold_test(config: ExperimentConfig) -> Result<()> {
    let testset = open_split(&config, Split::Test)?;
    let learner = load_meta_learner(&config, testset.feature_dim())?;
    MetaEvaluator::new(&config, learner, testset)?.threshold_test()?;
    Ok(())
}

fn ood_test(config: ExperimentConfig) -> Result<()> {
    let testset = open_split(&config, Split::Test)?;
    let ood_set = FeatureDataset::load(&config.ood_dataset_path())?;
    if ood_set.feature_dim() != testset.feature_dim() {
        return Err(MtedlError::ShapeMismatch {
            context: "OOD features vs in-distribution features".into(),
            expected: vec![testset.feature_dim()],
            actual: vec![ood_set.feature_dim()],
        });
    }
    let learner = load_meta_learner(&config, testset.feature_dim())?;
    OodEvaluator::new(&config, learner, testset, ood_set)?.run()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_type_is_rejected() {
        let config = ExperimentConfig {
            model_type: "ResNet".into(),
            ..ExperimentConfig::default()
        };
        let err = build_learner(&config, 4).err().unwrap();
        assert_eq!(err.code(), "E001");
    }

    #[test]
    fn test_active_phase_is_rejected() {
        let config = ExperimentConfig {
            phase: Phase::Active,
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            run_phase(config).unwrap_err(),
            MtedlError::Configuration { .. }
        ));
    }

    #[test]
    fn test_missing_dataset_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ExperimentConfig {
            phase: Phase::MetaEval,
            data_root: dir.path().to_path_buf(),
            ..ExperimentConfig::default()
        };
        assert!(matches!(run_phase(config).unwrap_err(), MtedlError::Io { .. }));
    }

    #[test]
    fn test_dry_run_does_not_touch_data() {
        let args = RunArgs {
            dry_run: true,
            way: Some(3),
            data_root: Some("/nonexistent".into()),
            ..RunArgs::default()
        };
        run_run(args, LogLevel::Quiet).unwrap();
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let args = RunArgs {
            way: Some(0),
            ..RunArgs::default()
        };
        assert_eq!(run_run(args, LogLevel::Quiet).unwrap_err().code(), "E001");
    }
}
