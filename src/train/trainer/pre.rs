//! Supervised pretraining of the encoder

use super::{ensure_finite, query_loss, TrainResult, REPORT_EVERY};
use crate::autograd::{backward, Tensor};
use crate::config::ExperimentConfig;
use crate::data::{CategoriesSampler, Dataset, Episode};
use crate::edl::{expected_probability, EvidentialLoss};
use crate::io::save_checkpoint;
use crate::model::PretrainClassifier;
use crate::nn::{Backbone, Module};
use crate::optim::{LRScheduler, Optimizer, StepDecayLR, SGD};
use crate::train::{count_acc, CrossEntropyLoss, Timer, TrainingLog, TRLOG_FILE};
use mtedl_common::{Averager, MtedlError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Trains encoder + classifier over every base class with softmax
/// cross-entropy, validating with few-shot episodes
///
/// Only the encoder is checkpointed (`max_acc.json`, unprefixed keys), which
/// is what the meta learner loads into both of its branches.
pub struct PreTrainer<B: Backbone, D: Dataset> {
    config: ExperimentConfig,
    model: PretrainClassifier<B>,
    trainset: D,
    valset: D,
    /// Dataset label to classifier output
    label_map: BTreeMap<usize, usize>,
    val_sampler: CategoriesSampler,
    optimizer: SGD,
    scheduler: StepDecayLR,
    save_dir: PathBuf,
    rng: StdRng,
}

impl<B: Backbone, D: Dataset> PreTrainer<B, D> {
    pub fn new(config: ExperimentConfig, encoder: B, trainset: D, valset: D) -> Result<Self> {
        let label_map: BTreeMap<usize, usize> = trainset
            .labels()
            .into_iter()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(output, label)| (label, output))
            .collect();
        if label_map.is_empty() {
            return Err(MtedlError::config(
                "dataset",
                "the training split is empty",
                "Check data_root and the dataset files",
            ));
        }

        let val_sampler = CategoriesSampler::new(
            &valset.labels(),
            config.val_num_batch,
            config.way,
            config.shot + config.val_query,
        )?;

        let mut rng = config.rng();
        let model = PretrainClassifier::new(
            encoder,
            label_map.len(),
            config.way,
            config.evidence,
            &mut rng,
        );
        let optimizer = SGD::new(config.pre_lr, config.pre_custom_momentum)
            .with_nesterov(true)
            .with_weight_decay(config.pre_custom_weight_decay);

        Ok(Self {
            scheduler: StepDecayLR::new(config.pre_lr, config.pre_step_size, config.pre_gamma),
            save_dir: config.pre_save_dir(),
            config,
            model,
            trainset,
            valset,
            label_map,
            val_sampler,
            optimizer,
            rng,
        })
    }

    pub fn model(&self) -> &PretrainClassifier<B> {
        &self.model
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.lr()
    }

    /// One pass over the shuffled training split in mini-batches
    pub fn train_epoch(&mut self, epoch: usize) -> Result<(f64, f64)> {
        let mut order: Vec<usize> = (0..self.trainset.len()).collect();
        order.shuffle(&mut self.rng);
        let params = self.model.parameters();
        let criterion = CrossEntropyLoss;

        let mut loss_avg = Averager::new();
        let mut acc_avg = Averager::new();
        for (index, batch) in order.chunks(self.config.pre_batch_size.max(1)).enumerate() {
            let labels: Vec<usize> = batch
                .iter()
                .map(|&i| self.label_map[&self.trainset.label(i)])
                .collect();
            let inputs = Tensor::constant(self.trainset.features(batch));

            let logits = self.model.forward(&inputs);
            ensure_finite(&logits, "logits", epoch, index)?;
            let loss = criterion.with_labels(&logits, &labels)?;
            ensure_finite(&loss, "loss", epoch, index)?;
            let acc = count_acc(&logits.data(), &labels);

            self.optimizer.zero_grad(&params);
            backward(&loss, None);
            self.optimizer.step(&params);

            let loss = loss.item();
            debug!(epoch, batch = index, loss, acc, "pretrain batch");
            loss_avg.add(f64::from(loss));
            acc_avg.add(acc);
        }
        Ok((loss_avg.item(), acc_avg.item()))
    }

    /// Few-shot validation: a fresh head adapted on each episode's support
    pub fn validate(&mut self, epoch: usize) -> Result<(f64, f64)> {
        let loss_fn = EvidentialLoss::new(self.config.loss_type, self.config.way, self.config.annealing_step())
            .at_epoch(epoch);
        let tasks = self
            .val_sampler
            .iter(&mut self.rng)
            .collect::<Result<Vec<_>>>()?;

        let mut loss_avg = Averager::new();
        let mut acc_avg = Averager::new();
        for (index, task) in tasks.iter().enumerate() {
            let episode = Episode::assemble(&self.valset, task, self.config.shot)?;
            let evidence = self.model.episode_evidence(
                &episode.support_tensor(),
                &episode.support_labels,
                &episode.query_tensor(),
                self.config.update_step,
                self.config.base_lr,
            )?;
            let (alpha, loss) = query_loss(&loss_fn, &evidence, &episode.query_labels, epoch, index)?;
            loss_avg.add(f64::from(loss.item()));
            acc_avg.add(count_acc(&expected_probability(&alpha.data()), &episode.query_labels));
        }
        Ok((loss_avg.item(), acc_avg.item()))
    }

    /// Run epochs `1..=pre_max_epoch`
    pub fn train(&mut self) -> Result<TrainResult> {
        let timer = Timer::new();
        let args = serde_json::to_value(&self.config)
            .map_err(|e| MtedlError::serialization(format!("config snapshot: {e}")))?;
        let mut trlog = TrainingLog::new(args);
        let max_epoch = self.config.pre_max_epoch;

        info!(
            save_dir = %self.save_dir.display(),
            device = %self.config.gpu,
            num_classes = self.model.num_classes(),
            "pretraining started"
        );

        for epoch in 1..=max_epoch {
            let (train_loss, train_acc) = self.train_epoch(epoch)?;
            let (val_loss, val_acc) = self.validate(epoch)?;

            if epoch % REPORT_EVERY == 0 {
                info!(
                    "Best Epoch {}, Best Val Acc={:.4}",
                    trlog.max_acc_epoch, trlog.max_acc
                );
            }
            info!(
                epoch,
                train_loss,
                train_acc,
                val_loss,
                val_acc,
                lr = self.optimizer.lr(),
                "epoch finished"
            );

            if trlog.improve(val_acc, epoch) {
                save_checkpoint(
                    &self.model.encoder_state_dict(),
                    self.save_dir.join("max_acc.json"),
                )?;
            }
            trlog.record_epoch(train_loss, train_acc, val_loss, val_acc);
            trlog.save(&self.save_dir.join(TRLOG_FILE))?;

            self.scheduler.step();
            self.scheduler.apply(&mut self.optimizer);

            if epoch % REPORT_EVERY == 0 {
                info!(
                    "Running Time: {}, Estimated Time: {}",
                    timer.measure(1.0),
                    timer.measure(epoch as f64 / max_epoch as f64)
                );
            }
        }

        Ok(TrainResult::from_log(
            &trlog,
            timer.elapsed().as_secs_f64(),
            self.save_dir.clone(),
        ))
    }
}
