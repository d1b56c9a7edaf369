//! Meta-training loop of the meta-transfer learner

use super::{query_loss, TrainResult, REPORT_EVERY};
use crate::autograd::{backward, Tensor};
use crate::config::ExperimentConfig;
use crate::data::{CategoriesSampler, Dataset, Episode, SampledTask};
use crate::edl::{expected_probability, EvidentialLoss};
use crate::io::save_checkpoint;
use crate::model::{Mode, MtlLearner};
use crate::nn::{Backbone, Module};
use crate::optim::{Adam, LRScheduler, ParamGroups, StepDecayLR};
use crate::train::{count_acc, Timer, TrainingLog, TRLOG_FILE};
use mtedl_common::{Averager, MtedlError, Result};
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Periodic checkpoints are written every this many epochs
const SAVE_EVERY: usize = 20;

/// Outer loop over training episodes with per-epoch validation
///
/// Each epoch adapts the heads on every training episode, backpropagates the
/// evidential query loss through the adaptation into the encoder and the head
/// initializations, then validates in evaluation mode. `max_acc.json` is
/// rewritten whenever validation accuracy strictly improves and `trlog.json`
/// after every epoch.
pub struct MetaTrainer<B: Backbone, D: Dataset> {
    config: ExperimentConfig,
    model: MtlLearner<B>,
    trainset: D,
    valset: D,
    train_sampler: CategoriesSampler,
    val_sampler: CategoriesSampler,
    optimizer: ParamGroups,
    scheduler: StepDecayLR,
    save_dir: PathBuf,
    rng: StdRng,
}

impl<B: Backbone, D: Dataset> MetaTrainer<B, D> {
    pub fn new(config: ExperimentConfig, model: MtlLearner<B>, trainset: D, valset: D) -> Result<Self> {
        let train_sampler = CategoriesSampler::new(
            &trainset.labels(),
            config.train_num_batch,
            config.way,
            config.shot + config.train_query,
        )?;
        let val_sampler = CategoriesSampler::new(
            &valset.labels(),
            config.val_num_batch,
            config.way,
            config.shot + config.val_query,
        )?;

        let mut optimizer = ParamGroups::new();
        optimizer.push(
            "encoder",
            model.encoder_parameters(),
            Box::new(Adam::default_params(config.meta_lr1)),
        );
        optimizer.push(
            "meta_base_learner",
            model.meta_base_learner().parameters(),
            Box::new(Adam::default_params(config.meta_lr2)),
        );
        optimizer.push(
            "pre_base_learner",
            model.pre_base_learner().parameters(),
            Box::new(Adam::default_params(config.meta_lr2)),
        );

        Ok(Self {
            scheduler: StepDecayLR::factor_only(config.step_size, config.gamma),
            save_dir: config.meta_save_dir(),
            rng: config.rng(),
            config,
            model,
            trainset,
            valset,
            train_sampler,
            val_sampler,
            optimizer,
        })
    }

    pub fn model(&self) -> &MtlLearner<B> {
        &self.model
    }

    pub fn into_model(self) -> MtlLearner<B> {
        self.model
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Current learning rate of every parameter group
    pub fn learning_rates(&self) -> Vec<f32> {
        self.optimizer.lrs()
    }

    fn loss_fn(&self, epoch: usize) -> EvidentialLoss {
        EvidentialLoss::new(self.config.loss_type, self.config.way, self.config.annealing_step())
            .at_epoch(epoch)
    }

    /// Query loss and accuracy of one episode under the current mode
    fn episode(
        &self,
        dataset: &D,
        task: &SampledTask,
        loss_fn: &EvidentialLoss,
        epoch: usize,
        index: usize,
    ) -> Result<(Tensor, f64)> {
        let episode = Episode::assemble(dataset, task, self.config.shot)?;
        let evidence = self.model.meta_forward(
            &episode.support_tensor(),
            &episode.support_labels,
            &episode.query_tensor(),
        )?;
        let (alpha, loss) = query_loss(loss_fn, &evidence, &episode.query_labels, epoch, index)?;

        let acc = count_acc(&expected_probability(&alpha.data()), &episode.query_labels);
        Ok((loss, acc))
    }

    /// Mean training loss and accuracy over the epoch's episodes
    pub fn train_epoch(&mut self, epoch: usize) -> Result<(f64, f64)> {
        self.model.set_mode(Mode::Train);
        let loss_fn = self.loss_fn(epoch);
        let tasks = self
            .train_sampler
            .iter(&mut self.rng)
            .collect::<Result<Vec<_>>>()?;

        let mut loss_avg = Averager::new();
        let mut acc_avg = Averager::new();
        for (index, task) in tasks.iter().enumerate() {
            let (loss, acc) = self.episode(&self.trainset, task, &loss_fn, epoch, index)?;
            self.optimizer.zero_grad();
            backward(&loss, None);
            self.optimizer.step();

            let loss = loss.item();
            debug!(epoch, task = index, loss, acc, "train episode");
            loss_avg.add(f64::from(loss));
            acc_avg.add(acc);
        }
        Ok((loss_avg.item(), acc_avg.item()))
    }

    /// Mean validation loss and accuracy; no parameter is touched
    pub fn validate(&mut self, epoch: usize) -> Result<(f64, f64)> {
        self.model.set_mode(Mode::Eval);
        let loss_fn = self.loss_fn(epoch);
        let tasks = self
            .val_sampler
            .iter(&mut self.rng)
            .collect::<Result<Vec<_>>>()?;

        let mut loss_avg = Averager::new();
        let mut acc_avg = Averager::new();
        for (index, task) in tasks.iter().enumerate() {
            let (loss, acc) = self.episode(&self.valset, task, &loss_fn, epoch, index)?;
            loss_avg.add(f64::from(loss.item()));
            acc_avg.add(acc);
        }
        self.model.set_mode(Mode::Train);
        Ok((loss_avg.item(), acc_avg.item()))
    }

    fn save_model(&self, name: &str) -> Result<()> {
        save_checkpoint(
            &self.model.state_dict(),
            self.save_dir.join(format!("{name}.json")),
        )
    }

    /// Run epochs `1..=max_epoch`
    pub fn train(&mut self) -> Result<TrainResult> {
        let timer = Timer::new();
        let args = serde_json::to_value(&self.config)
            .map_err(|e| MtedlError::serialization(format!("config snapshot: {e}")))?;
        let mut trlog = TrainingLog::new(args);
        let max_epoch = self.config.max_epoch;

        info!(
            save_dir = %self.save_dir.display(),
            device = %self.config.gpu,
            way = self.config.way,
            shot = self.config.shot,
            loss_type = %self.config.loss_type,
            "meta-training started"
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
                lrs = ?self.optimizer.lrs(),
                "epoch finished"
            );

            if trlog.improve(val_acc, epoch) {
                self.save_model("max_acc")?;
            }
            if epoch % SAVE_EVERY == 0 {
                self.save_model(&format!("epoch{epoch}"))?;
            }

            trlog.record_epoch(train_loss, train_acc, val_loss, val_acc);
            trlog.save(&self.save_dir.join(TRLOG_FILE))?;

            self.scheduler.step();
            self.scheduler.apply_groups(&mut self.optimizer);

            if epoch % REPORT_EVERY == 0 {
                info!(
                    "Running Time: {}, Estimated Time: {}",
                    timer.measure(1.0),
                    timer.measure(epoch as f64 / max_epoch as f64)
                );
            }
        }

        info!(
            max_acc = trlog.max_acc,
            max_acc_epoch = trlog.max_acc_epoch,
            "meta-training finished"
        );
        Ok(TrainResult::from_log(
            &trlog,
            timer.elapsed().as_secs_f64(),
            self.save_dir.clone(),
        ))
    }
}
