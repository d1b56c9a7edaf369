//! Out-of-distribution detection with Dirichlet uncertainty
//!
//! Each test task pairs an in-distribution episode with an episode drawn from
//! the OOD pool. The heads are adapted once on the in-distribution support
//! set; both query sets are then scored by differential entropy, mutual
//! information and precision, with OOD rows as the positive class.

use super::try_roc_auc;
use crate::config::ExperimentConfig;
use crate::data::{CategoriesSampler, Dataset, Episode, SampledTask};
use crate::edl::UncertaintyScores;
use crate::model::{Mode, MtlLearner};
use crate::nn::Backbone;
use crate::train::ensure_finite;
use mtedl_common::{MtedlError, Result, RunningStats, Summary};
use ndarray::Array2;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{info, warn};

/// AUROC of each statistic on one task, NaN where undefined
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OodTaskScores {
    pub differential_entropy: f64,
    pub mutual_information: f64,
    pub precision: f64,
}

impl OodTaskScores {
    /// Names of the statistics whose AUROC is undefined
    pub fn undefined(&self) -> Vec<&'static str> {
        [
            ("differential_entropy", self.differential_entropy),
            ("mutual_information", self.mutual_information),
            ("precision", self.precision),
        ]
        .into_iter()
        .filter(|(_, auc)| auc.is_nan())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Score one task from the Dirichlet parameters of both query sets
pub fn score_ood_task(in_alpha: &Array2<f32>, ood_alpha: &Array2<f32>) -> OodTaskScores {
    assess_ood_task(in_alpha, ood_alpha).0
}

/// [`score_ood_task`] plus an [`MtedlError::UndefinedMetric`] for every
/// statistic whose AUROC is NaN
pub fn assess_ood_task(in_alpha: &Array2<f32>, ood_alpha: &Array2<f32>) -> (OodTaskScores, Vec<MtedlError>) {
    let scores = UncertaintyScores::from_alpha(in_alpha).concat(&UncertaintyScores::from_alpha(ood_alpha));
    let labels: Vec<bool> = std::iter::repeat(false)
        .take(in_alpha.nrows())
        .chain(std::iter::repeat(true).take(ood_alpha.nrows()))
        .collect();

    let mut undefined = Vec::new();
    let mut auroc = |metric: &str, values: &[f64]| {
        try_roc_auc(metric, values, &labels).unwrap_or_else(|err| {
            undefined.push(err);
            f64::NAN
        })
    };
    let task = OodTaskScores {
        differential_entropy: auroc("differential_entropy", &scores.differential_entropy),
        mutual_information: auroc("mutual_information", &scores.mutual_information),
        precision: auroc("precision", &scores.precision),
    };
    (task, undefined)
}

/// Running AUROC statistics over the tasks processed so far
#[derive(Debug, Default)]
pub struct OodAggregate {
    pub differential_entropy: RunningStats,
    pub mutual_information: RunningStats,
    pub precision: RunningStats,
    /// Tasks with at least one undefined AUROC
    pub flagged: usize,
    /// Undefined AUROCs by zero-based task index
    pub undefined: Vec<(usize, MtedlError)>,
}

impl OodAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a task; NaN entries are skipped by the running statistics
    pub fn add(&mut self, scores: &OodTaskScores) {
        let mut defined = self.differential_entropy.add(scores.differential_entropy);
        defined &= self.mutual_information.add(scores.mutual_information);
        defined &= self.precision.add(scores.precision);
        if !defined {
            self.flagged += 1;
        }
    }

    /// Fold in task `index` together with the metrics it left undefined
    pub fn add_task(&mut self, index: usize, scores: &OodTaskScores, undefined: Vec<MtedlError>) {
        self.add(scores);
        self.undefined.extend(undefined.into_iter().map(|err| (index, err)));
    }

    pub fn report(self, tasks: usize) -> OodReport {
        OodReport {
            tasks,
            flagged: self.flagged,
            differential_entropy: self.differential_entropy.summary(),
            mutual_information: self.mutual_information.summary(),
            precision: self.precision.summary(),
            undefined: self.undefined,
        }
    }
}

/// Final AUROC summaries (fractions, not percent)
#[derive(Debug)]
pub struct OodReport {
    pub tasks: usize,
    pub flagged: usize,
    pub differential_entropy: Option<Summary>,
    pub mutual_information: Option<Summary>,
    pub precision: Option<Summary>,
    /// Non-fatal [`MtedlError::UndefinedMetric`] entries with their task index
    pub undefined: Vec<(usize, MtedlError)>,
}

fn percent(summary: Option<Summary>) -> String {
    summary.map_or_else(
        || "n/a".to_string(),
        |s| format!("{:.2}({:.2}) +- {:.2}", s.mean * 100.0, s.std * 100.0, s.ci95 * 100.0),
    )
}

/// Paired in-distribution / OOD test over `task_num` tasks
pub struct OodEvaluator<B: Backbone, D: Dataset> {
    model: MtlLearner<B>,
    in_set: D,
    ood_set: D,
    in_sampler: CategoriesSampler,
    ood_sampler: CategoriesSampler,
    shot: usize,
    rng: StdRng,
}

impl<B: Backbone, D: Dataset> OodEvaluator<B, D> {
    pub fn new(config: &ExperimentConfig, mut model: MtlLearner<B>, in_set: D, ood_set: D) -> Result<Self> {
        let per_class = config.shot + config.query;
        let in_sampler = CategoriesSampler::new(&in_set.labels(), config.task_num, config.way, per_class)?;
        let ood_sampler = CategoriesSampler::new(&ood_set.labels(), config.task_num, config.way, per_class)?;
        model.set_mode(Mode::Eval);
        Ok(Self {
            model,
            in_set,
            ood_set,
            in_sampler,
            ood_sampler,
            shot: config.shot,
            rng: config.rng(),
        })
    }

    /// Adapt on the in-distribution support, score both query sets
    pub fn evaluate_task(
        &self,
        in_task: &SampledTask,
        ood_task: &SampledTask,
        index: usize,
    ) -> Result<(OodTaskScores, Vec<MtedlError>)> {
        let episode = Episode::assemble(&self.in_set, in_task, self.shot)?;
        let ood_episode = Episode::assemble(&self.ood_set, ood_task, self.shot)?;
        let (in_evidence, ood_evidence) = self.model.ood_forward(
            &episode.support_tensor(),
            &episode.support_labels,
            &episode.query_tensor(),
            &ood_episode.query_tensor(),
        )?;
        ensure_finite(&in_evidence, "evidence", 0, index)?;
        ensure_finite(&ood_evidence, "ood evidence", 0, index)?;

        let in_alpha = in_evidence.to_array() + 1.0;
        let ood_alpha = ood_evidence.to_array() + 1.0;
        Ok(assess_ood_task(&in_alpha, &ood_alpha))
    }

    pub fn run(&mut self) -> Result<OodReport> {
        let in_tasks = self.in_sampler.iter(&mut self.rng).collect::<Result<Vec<_>>>()?;
        let ood_tasks = self.ood_sampler.iter(&mut self.rng).collect::<Result<Vec<_>>>()?;

        let mut aggregate = OodAggregate::new();
        for (index, (in_task, ood_task)) in in_tasks.iter().zip(&ood_tasks).enumerate() {
            let (scores, undefined) = self.evaluate_task(in_task, ood_task, index)?;
            for err in &undefined {
                warn!(task = index + 1, code = err.code(), "{err}, excluded from the average");
            }
            aggregate.add_task(index, &scores, undefined);

            info!(
                "batch {}: DE {}, MI {}, Precision {}",
                index + 1,
                percent(aggregate.differential_entropy.summary()),
                percent(aggregate.mutual_information.summary()),
                percent(aggregate.precision.summary()),
            );
        }

        let report = aggregate.report(in_tasks.len());
        info!(
            tasks = report.tasks,
            flagged = report.flagged,
            "OOD test finished: DE {}, MI {}, Precision {}",
            percent(report.differential_entropy),
            percent(report.mutual_information),
            percent(report.precision),
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    /// Confident rows for in-distribution, flat rows for OOD
    fn confident(rows: usize, way: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, way), |(r, c)| if c == r % way { 40.0 } else { 1.0 })
    }

    fn flat(rows: usize, way: usize) -> Array2<f32> {
        Array2::from_elem((rows, way), 1.2)
    }

    #[test]
    fn test_separated_uncertainty_scores_one() {
        let scores = score_ood_task(&confident(75, 5), &flat(75, 5));
        assert_eq!(scores.differential_entropy, 1.0);
        assert_eq!(scores.mutual_information, 1.0);
        assert_eq!(scores.precision, 1.0);
        assert!(scores.undefined().is_empty());
    }

    #[test]
    fn test_empty_query_is_flagged_and_excluded() {
        let degenerate = score_ood_task(&Array2::zeros((0, 5)), &flat(10, 5));
        assert_eq!(degenerate.undefined().len(), 3);

        let mut aggregate = OodAggregate::new();
        aggregate.add(&score_ood_task(&confident(10, 5), &flat(10, 5)));
        aggregate.add(&degenerate);
        assert_eq!(aggregate.differential_entropy.len(), 1);
        assert_eq!(aggregate.differential_entropy.skipped(), 1);
        let report = aggregate.report(2);
        assert_eq!(report.flagged, 1);
        let de = report.differential_entropy.unwrap();
        assert_abs_diff_eq!(de.mean, 1.0);
        assert_abs_diff_eq!(de.ci95, 0.0);
    }

    #[test]
    fn test_undefined_auroc_is_recorded_as_non_fatal_error() {
        let (scores, undefined) = assess_ood_task(&confident(10, 5), &Array2::zeros((0, 5)));
        assert_eq!(scores.undefined().len(), 3);
        assert_eq!(undefined.len(), 3);
        assert!(undefined
            .iter()
            .all(|err| matches!(err, MtedlError::UndefinedMetric { .. }) && !err.is_fatal()));

        let (clean, none) = assess_ood_task(&confident(10, 5), &flat(10, 5));
        assert!(none.is_empty());

        let mut aggregate = OodAggregate::new();
        aggregate.add_task(0, &clean, none);
        aggregate.add_task(1, &scores, undefined);
        let report = aggregate.report(2);
        assert_eq!(report.flagged, 1);
        assert_eq!(report.undefined.len(), 3);
        assert!(report.undefined.iter().all(|(task, _)| *task == 1));
        match &report.undefined[0].1 {
            MtedlError::UndefinedMetric { metric, reason } => {
                assert_eq!(metric, "differential_entropy");
                assert!(reason.contains("one class"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_running_statistics_follow_tasks() {
        let mut aggregate = OodAggregate::new();
        for auc in [0.8, 0.6] {
            aggregate.add(&OodTaskScores {
                differential_entropy: auc,
                mutual_information: auc,
                precision: auc,
            });
        }
        let s = aggregate.report(2).precision.unwrap();
        assert_abs_diff_eq!(s.mean, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(s.ci95, 1.96 * 0.1 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_percent_formatting() {
        let s = Summary { mean: 0.9, std: 0.05, ci95: 0.01 };
        assert_eq!(percent(Some(s)), "90.00(5.00) +- 1.00");
        assert_eq!(percent(None), "n/a");
    }
}
