//! Episode assembly

use super::{Dataset, SampledTask};
use crate::autograd::Tensor;
use mtedl_common::{MtedlError, Result};
use ndarray::{s, Array2};

/// `0, 1, ..., way-1` repeated `times` times
///
/// Matches the rank-major layout produced by [`Episode::assemble`].
pub fn repeat_labels(way: usize, times: usize) -> Vec<usize> {
    (0..times).flat_map(|_| 0..way).collect()
}

/// A few-shot task with canonical labels
#[derive(Debug, Clone)]
pub struct Episode {
    pub support: Array2<f32>,
    pub support_labels: Vec<usize>,
    pub query: Array2<f32>,
    pub query_labels: Vec<usize>,
    /// Dataset class of each canonical label
    pub classes: Vec<usize>,
}

impl Episode {
    /// Split a sampled task into `shot` support and the remaining query items
    /// per class
    ///
    /// Rows are laid out rank-major, so canonical label `c` is the position of
    /// the class in selection order and labels never depend on dataset ids.
    pub fn assemble<D: Dataset + ?Sized>(
        dataset: &D,
        task: &SampledTask,
        shot: usize,
    ) -> Result<Self> {
        let way = task.way();
        let per_class = task.indices.first().map_or(0, Vec::len);
        if shot == 0 || shot >= per_class {
            return Err(MtedlError::config(
                "shot",
                format!("shot {shot} leaves no query items out of {per_class} per class"),
                "Sample shot + query items per class with query >= 1",
            ));
        }

        let rows = dataset.features(&task.rank_major());
        let boundary = way * shot;
        Ok(Self {
            support: rows.slice(s![..boundary, ..]).to_owned(),
            support_labels: repeat_labels(way, shot),
            query: rows.slice(s![boundary.., ..]).to_owned(),
            query_labels: repeat_labels(way, per_class - shot),
            classes: task.classes.clone(),
        })
    }

    pub fn way(&self) -> usize {
        self.classes.len()
    }

    pub fn support_tensor(&self) -> Tensor {
        Tensor::constant(self.support.clone())
    }

    pub fn query_tensor(&self) -> Tensor {
        Tensor::constant(self.query.clone())
    }
}
