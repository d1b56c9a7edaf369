//! YAML schema for experiment configuration
//!
//! Every option has a default, so a config file only lists what it changes:
//!
//! ```yaml
//! dataset: CIFAR-FS
//! phase: meta_train
//! shot: 5
//! loss_type: digamma
//! encoder:
//!   hidden: [128]
//!   embedding_dim: 64
//! ```

use crate::data::Split;
use crate::edl::EdlLossType;
use crate::model::{EvidenceActivation, LearnerSettings};
use mtedl_common::MtedlError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directory (under `data_root`) of the out-of-distribution pool
pub const OOD_DATASET_DIR: &str = "places";

/// In-distribution benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatasetKind {
    #[default]
    #[serde(rename = "miniImageNet")]
    MiniImageNet,
    #[serde(rename = "CIFAR-FS")]
    CifarFs,
    #[serde(rename = "FC100")]
    Fc100,
}

impl DatasetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MiniImageNet => "miniImageNet",
            Self::CifarFs => "CIFAR-FS",
            Self::Fc100 => "FC100",
        }
    }

    /// Directory under `data_root` holding `train.json`, `val.json`, `test.json`
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::MiniImageNet => "mini_imagenet",
            Self::CifarFs => "cifar_fs",
            Self::Fc100 => "fc100",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = MtedlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "miniImageNet" => Ok(Self::MiniImageNet),
            "CIFAR-FS" => Ok(Self::CifarFs),
            "FC100" => Ok(Self::Fc100),
            other => Err(MtedlError::config(
                "dataset",
                format!("unknown dataset '{other}'"),
                "Use one of: miniImageNet, CIFAR-FS, FC100",
            )),
        }
    }
}

/// What a run does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "pre_train")]
    PreTrain,
    #[default]
    #[serde(rename = "meta_train")]
    MetaTrain,
    #[serde(rename = "meta_eval")]
    MetaEval,
    #[serde(rename = "OOD_test")]
    OodTest,
    #[serde(rename = "threshold_test")]
    ThresholdTest,
    /// Recognized but not runnable
    #[serde(rename = "active")]
    Active,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreTrain => "pre_train",
            Self::MetaTrain => "meta_train",
            Self::MetaEval => "meta_eval",
            Self::OodTest => "OOD_test",
            Self::ThresholdTest => "threshold_test",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = MtedlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre_train" => Ok(Self::PreTrain),
            "meta_train" => Ok(Self::MetaTrain),
            "meta_eval" => Ok(Self::MetaEval),
            "OOD_test" => Ok(Self::OodTest),
            "threshold_test" => Ok(Self::ThresholdTest),
            "active" => Ok(Self::Active),
            other => Err(MtedlError::config(
                "phase",
                format!("unknown phase '{other}'"),
                "Use one of: pre_train, meta_train, meta_eval, OOD_test, threshold_test",
            )),
        }
    }
}

/// Shape of the MLP encoder; the input width comes from the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub hidden: Vec<usize>,
    pub embedding_dim: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            hidden: vec![128],
            embedding_dim: 64,
        }
    }
}

/// Complete experiment description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset: DatasetKind,
    pub phase: Phase,
    pub model_type: String,
    pub encoder: EncoderConfig,

    /// Classes per task
    pub way: usize,
    /// Support items per class
    pub shot: usize,
    /// Query items per class during meta-training
    pub train_query: usize,
    /// Query items per class during validation
    pub val_query: usize,
    /// Query items per class at test time
    pub query: usize,

    pub train_num_batch: usize,
    pub val_num_batch: usize,
    /// Test tasks for meta_eval, OOD_test and threshold_test
    pub task_num: usize,

    pub loss_type: EdlLossType,
    pub evidence: EvidenceActivation,

    /// Outer learning rate of the encoder
    pub meta_lr1: f32,
    /// Outer learning rate of the two heads
    pub meta_lr2: f32,
    /// Inner step size of the meta head
    pub meta_base_lr: f32,
    /// Inner step size of the pretrain head
    pub pre_base_lr: f32,
    /// Inner step size used by pretraining validation
    pub base_lr: f32,
    pub update_step: usize,
    /// Epochs between learning-rate decays
    pub step_size: usize,
    pub gamma: f32,
    pub max_epoch: usize,
    /// KL annealing horizon; `5 * max_epoch` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annealing_step: Option<usize>,
    pub pretrain_evidence_weight: f32,

    /// `0` draws the seed from the OS
    pub seed: u64,
    /// Recorded for provenance; computation runs on the CPU
    pub gpu: String,

    pub pre_max_epoch: usize,
    pub pre_batch_size: usize,
    pub pre_lr: f32,
    pub pre_gamma: f32,
    pub pre_step_size: usize,
    pub pre_custom_momentum: f32,
    pub pre_custom_weight_decay: f32,

    pub data_root: PathBuf,
    pub log_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretrain_checkpoint: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_checkpoint: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::default(),
            phase: Phase::default(),
            model_type: "MLP".to_string(),
            encoder: EncoderConfig::default(),
            way: 5,
            shot: 1,
            train_query: 15,
            val_query: 15,
            query: 15,
            train_num_batch: 200,
            val_num_batch: 600,
            task_num: 600,
            loss_type: EdlLossType::default(),
            evidence: EvidenceActivation::default(),
            meta_lr1: 1e-4,
            meta_lr2: 1e-3,
            meta_base_lr: 0.01,
            pre_base_lr: 0.01,
            base_lr: 0.01,
            update_step: 100,
            step_size: 10,
            gamma: 0.5,
            max_epoch: 100,
            annealing_step: None,
            pretrain_evidence_weight: 10.0,
            seed: 0,
            gpu: "0".to_string(),
            pre_max_epoch: 110,
            pre_batch_size: 128,
            pre_lr: 0.1,
            pre_gamma: 0.2,
            pre_step_size: 30,
            pre_custom_momentum: 0.9,
            pre_custom_weight_decay: 5e-4,
            data_root: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
            pretrain_checkpoint: None,
            meta_checkpoint: None,
        }
    }
}

impl ExperimentConfig {
    pub fn annealing_step(&self) -> usize {
        self.annealing_step.unwrap_or(5 * self.max_epoch)
    }

    pub fn learner_settings(&self) -> LearnerSettings {
        LearnerSettings {
            way: self.way,
            update_step: self.update_step,
            meta_base_lr: self.meta_base_lr,
            pre_base_lr: self.pre_base_lr,
            pretrain_evidence_weight: self.pretrain_evidence_weight,
            activation: self.evidence,
        }
    }

    /// The run's random source; seed `0` means nondeterministic
    pub fn rng(&self) -> StdRng {
        if self.seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(self.seed)
        }
    }

    pub fn dataset_path(&self, split: Split) -> PathBuf {
        crate::data::FeatureDataset::split_path(&self.data_root, self.dataset.dir_name(), split)
    }

    pub fn ood_dataset_path(&self) -> PathBuf {
        crate::data::FeatureDataset::split_path(&self.data_root, OOD_DATASET_DIR, Split::Test)
    }

    /// `<log_dir>/meta/<dataset>_<model>_MT-EDL_loss.._lr1.._lr2.._batch.._maxepoch.._shot.._updatestep..`
    pub fn meta_save_dir(&self) -> PathBuf {
        let name = format!(
            "{}_{}_MT-EDL_loss{}_lr1{}_lr2{}_batch{}_maxepoch{}_shot{}_updatestep{}",
            self.dataset,
            self.model_type,
            self.loss_type,
            self.meta_lr1,
            self.meta_lr2,
            self.train_num_batch,
            self.max_epoch,
            self.shot,
            self.update_step,
        );
        self.log_dir.join("meta").join(name)
    }

    /// `<log_dir>/pre/<dataset>_<model>_batchsize.._lr.._gamma.._step.._maxepoch..`
    pub fn pre_save_dir(&self) -> PathBuf {
        let name = format!(
            "{}_{}_batchsize{}_lr{}_gamma{}_step{}_maxepoch{}",
            self.dataset,
            self.model_type,
            self.pre_batch_size,
            self.pre_lr,
            self.pre_gamma,
            self.pre_step_size,
            self.pre_max_epoch,
        );
        self.log_dir.join("pre").join(name)
    }

    /// Encoder checkpoint loaded before meta-training
    pub fn pretrain_checkpoint_path(&self) -> PathBuf {
        self.pretrain_checkpoint
            .clone()
            .unwrap_or_else(|| self.pre_save_dir().join("max_acc.json"))
    }

    /// Meta-trained checkpoint loaded by the test phases
    pub fn meta_checkpoint_path(&self) -> PathBuf {
        self.meta_checkpoint
            .clone()
            .unwrap_or_else(|| self.meta_save_dir().join("max_acc.json"))
    }

    /// Parse YAML without validating
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MtedlError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| MtedlError::serialization(format!("Failed to parse YAML config: {e}")))
    }

    /// Relative paths are resolved against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.data_root, &mut self.log_dir] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r"
dataset: CIFAR-FS
phase: OOD_test
shot: 5
loss_type: digamma
evidence: exp
";
        let config = ExperimentConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.dataset, DatasetKind::CifarFs);
        assert_eq!(config.phase, Phase::OodTest);
        assert_eq!(config.shot, 5);
        assert_eq!(config.loss_type, EdlLossType::Digamma);
        assert_eq!(config.evidence, EvidenceActivation::Exp);
        assert_eq!(config.way, 5);
        assert_eq!(config.annealing_step(), 500);
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        assert!(ExperimentConfig::from_yaml_str("dataset: ImageNet").is_err());
        assert!(ExperimentConfig::from_yaml_str("loss_type: hinge").is_err());
        assert!("tiered".parse::<Phase>().is_err());
    }

    #[test]
    fn test_enum_strings_round_trip() {
        for phase in [
            Phase::PreTrain,
            Phase::MetaTrain,
            Phase::MetaEval,
            Phase::OodTest,
            Phase::ThresholdTest,
            Phase::Active,
        ] {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
        for kind in [DatasetKind::MiniImageNet, DatasetKind::CifarFs, DatasetKind::Fc100] {
            assert_eq!(kind.as_str().parse::<DatasetKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_save_dir_naming() {
        let config = ExperimentConfig::default();
        let dir = config.meta_save_dir();
        assert_eq!(
            dir,
            PathBuf::from("logs/meta/miniImageNet_MLP_MT-EDL_losslog_lr10.0001_lr20.001_batch200_maxepoch100_shot1_updatestep100")
        );
        assert_eq!(config.meta_checkpoint_path(), dir.join("max_acc.json"));
        assert!(config.pretrain_checkpoint_path().starts_with("logs/pre"));
    }

    #[test]
    fn test_dataset_paths() {
        let config = ExperimentConfig {
            dataset: DatasetKind::Fc100,
            ..ExperimentConfig::default()
        };
        assert_eq!(config.dataset_path(Split::Val), PathBuf::from("data/fc100/val.json"));
        assert_eq!(config.ood_dataset_path(), PathBuf::from("data/places/test.json"));
    }

    #[test]
    fn test_explicit_seed_is_reproducible() {
        use rand::Rng;
        let config = ExperimentConfig {
            seed: 42,
            ..ExperimentConfig::default()
        };
        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
    }
}
