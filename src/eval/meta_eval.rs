//! Few-shot evaluation on the test split

use super::threshold::{default_thresholds, ThresholdAccumulator, ThresholdRow};
use crate::config::ExperimentConfig;
use crate::data::{CategoriesSampler, Dataset, Episode, SampledTask};
use crate::edl::expected_probability;
use crate::model::{Mode, MtlLearner};
use crate::nn::Backbone;
use crate::train::{count_acc, ensure_finite, expected_calibration_error, nll, ECE_BINS};
use mtedl_common::{compute_confidence_interval, Result, RunningStats, Summary};
use ndarray::Array2;
use rand::rngs::StdRng;
use tracing::{debug, info};

/// Mean accuracy, calibration error and negative log-likelihood over the test tasks
#[derive(Debug, Clone, PartialEq)]
pub struct MetaEvalReport {
    pub tasks: usize,
    pub accuracy: Option<Summary>,
    pub ece: Option<Summary>,
    pub nll: Option<Summary>,
}

/// Runs `task_num` test episodes through the adapted learner
pub struct MetaEvaluator<B: Backbone, D: Dataset> {
    model: MtlLearner<B>,
    testset: D,
    sampler: CategoriesSampler,
    shot: usize,
    rng: StdRng,
}

impl<B: Backbone, D: Dataset> MetaEvaluator<B, D> {
    pub fn new(config: &ExperimentConfig, mut model: MtlLearner<B>, testset: D) -> Result<Self> {
        let sampler = CategoriesSampler::new(
            &testset.labels(),
            config.task_num,
            config.way,
            config.shot + config.query,
        )?;
        model.set_mode(Mode::Eval);
        Ok(Self {
            model,
            testset,
            sampler,
            shot: config.shot,
            rng: config.rng(),
        })
    }

    /// Dirichlet parameters of the query rows and their labels
    fn query_alpha(&self, task: &SampledTask, index: usize) -> Result<(Array2<f32>, Vec<usize>)> {
        let episode = Episode::assemble(&self.testset, task, self.shot)?;
        let evidence = self.model.meta_forward(
            &episode.support_tensor(),
            &episode.support_labels,
            &episode.query_tensor(),
        )?;
        ensure_finite(&evidence, "evidence", 0, index)?;
        Ok((evidence.to_array() + 1.0, episode.query_labels))
    }

    fn draw_tasks(&mut self) -> Result<Vec<SampledTask>> {
        self.sampler.iter(&mut self.rng).collect()
    }

    pub fn run(&mut self) -> Result<MetaEvalReport> {
        let tasks = self.draw_tasks()?;
        let mut accuracy = RunningStats::new();
        let mut ece = RunningStats::new();
        let mut log_loss = RunningStats::new();

        for (index, task) in tasks.iter().enumerate() {
            let (alpha, labels) = self.query_alpha(task, index)?;
            let probs = expected_probability(&alpha);
            let acc = count_acc(&probs, &labels);
            let calibration = expected_calibration_error(&probs, &labels, ECE_BINS);
            accuracy.add(acc);
            ece.add(calibration);
            log_loss.add(nll(&probs, &labels));

            let (mean, ci95) = compute_confidence_interval(accuracy.values());
            debug!(
                "batch {}: {:.2} +- {:.2} ({:.2}), ECE {:.4}",
                index + 1,
                mean * 100.0,
                ci95 * 100.0,
                acc * 100.0,
                calibration
            );
        }

        let report = MetaEvalReport {
            tasks: tasks.len(),
            accuracy: accuracy.summary(),
            ece: ece.summary(),
            nll: log_loss.summary(),
        };
        if let (Some(acc), Some(ece)) = (report.accuracy, report.ece) {
            info!(
                tasks = report.tasks,
                nll = report.nll.map_or(f64::NAN, |s| s.mean),
                "Test Acc {:.4} + {:.4}, ECE {:.4} + {:.4}",
                acc.mean,
                acc.ci95,
                ece.mean,
                ece.ci95
            );
        }
        Ok(report)
    }

    /// Accuracy and coverage of predictions with uncertainty `K / S` at or
    /// below each threshold in `0.1, ..., 1.0`
    pub fn threshold_test(&mut self) -> Result<Vec<ThresholdRow>> {
        let tasks = self.draw_tasks()?;
        let mut accumulator = ThresholdAccumulator::new(&default_thresholds());
        for (index, task) in tasks.iter().enumerate() {
            let (alpha, labels) = self.query_alpha(task, index)?;
            accumulator.add_task(&alpha, &labels);
        }

        for row in accumulator.rows() {
            match row.accuracy() {
                Some(acc) => info!(
                    "threshold {:.1}: acc {:.4}, kept {}/{} ({:.2}%)",
                    row.threshold,
                    acc,
                    row.kept,
                    row.total,
                    row.coverage() * 100.0
                ),
                None => info!("threshold {:.1}: no prediction kept", row.threshold),
            }
        }
        Ok(accumulator.rows().to_vec())
    }
}
