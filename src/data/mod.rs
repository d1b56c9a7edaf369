//! Few-shot data pipeline
//!
//! A [`Dataset`] exposes labeled items; a [`CategoriesSampler`] draws
//! `way`-class index batches from it; [`Episode::assemble`] turns a batch into
//! support and query matrices with canonical `0..way` labels.

mod dataset;
mod episode;
mod sampler;

pub use dataset::{Dataset, FeatureDataset, Split};
pub use episode::{repeat_labels, Episode};
pub use sampler::{CategoriesSampler, SampledTask, TaskIter};
