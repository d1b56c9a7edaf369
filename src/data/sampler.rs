//! Episodic index sampler
//!
//! Each task selects `way` distinct classes uniformly without replacement, then
//! `per_class` distinct items of every selected class. Items stay grouped by
//! class, in the order the classes were drawn.

use mtedl_common::{MtedlError, Result};
use rand::seq::index;
use rand::Rng;
use std::collections::BTreeMap;

/// One drawn task: the selected classes and, per class, the sampled item indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledTask {
    pub classes: Vec<usize>,
    pub indices: Vec<Vec<usize>>,
}

impl SampledTask {
    pub fn way(&self) -> usize {
        self.classes.len()
    }

    /// Indices grouped by class (class blocks in selection order)
    pub fn grouped(&self) -> Vec<usize> {
        self.indices.iter().flatten().copied().collect()
    }

    /// Indices interleaved rank by rank: the `r`-th item of every class, then
    /// the `r + 1`-th, so position `i` belongs to class block `i % way`
    pub fn rank_major(&self) -> Vec<usize> {
        let per_class = self.indices.first().map_or(0, Vec::len);
        (0..per_class)
            .flat_map(|rank| self.indices.iter().map(move |block| block[rank]))
            .collect()
    }
}

/// Draws `num_batches` tasks of `way` classes x `per_class` items
#[derive(Debug, Clone)]
pub struct CategoriesSampler {
    num_batches: usize,
    way: usize,
    per_class: usize,
    /// Item indices for each class present in the pool, ordered by class id
    pool: Vec<(usize, Vec<usize>)>,
}

impl CategoriesSampler {
    pub fn new(labels: &[usize], num_batches: usize, way: usize, per_class: usize) -> Result<Self> {
        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(index);
        }
        if way == 0 || way > by_class.len() {
            return Err(MtedlError::config(
                "way",
                format!(
                    "cannot draw {way} classes from a pool of {} classes",
                    by_class.len()
                ),
                "Lower way or use a split with more classes",
            ));
        }
        Ok(Self {
            num_batches,
            way,
            per_class,
            pool: by_class.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.num_batches
    }

    pub fn is_empty(&self) -> bool {
        self.num_batches == 0
    }

    pub fn way(&self) -> usize {
        self.way
    }

    pub fn per_class(&self) -> usize {
        self.per_class
    }

    pub fn num_classes(&self) -> usize {
        self.pool.len()
    }

    /// Draw a single task
    ///
    /// Class sizes are checked here, for the classes actually drawn: a pool may
    /// hold short classes as long as no task selects them.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<SampledTask> {
        let picks = index::sample(rng, self.pool.len(), self.way);
        let mut classes = Vec::with_capacity(self.way);
        let mut indices = Vec::with_capacity(self.way);

        for pick in picks.iter() {
            let (class, items) = &self.pool[pick];
            if items.len() < self.per_class {
                return Err(MtedlError::InsufficientSamples {
                    class: *class,
                    available: items.len(),
                    required: self.per_class,
                });
            }
            let chosen = index::sample(rng, items.len(), self.per_class);
            classes.push(*class);
            indices.push(chosen.iter().map(|i| items[i]).collect());
        }

        Ok(SampledTask { classes, indices })
    }

    /// Lazy sequence of `len()` tasks; every call starts a fresh sequence
    pub fn iter<'a, R: Rng>(&'a self, rng: &'a mut R) -> TaskIter<'a, R> {
        TaskIter {
            sampler: self,
            rng,
            remaining: self.num_batches,
        }
    }
}

/// Iterator returned by [`CategoriesSampler::iter`]
pub struct TaskIter<'a, R: Rng> {
    sampler: &'a CategoriesSampler,
    rng: &'a mut R,
    remaining: usize,
}

impl<R: Rng> Iterator for TaskIter<'_, R> {
    type Item = Result<SampledTask>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.sampler.sample(self.rng))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Rng> ExactSizeIterator for TaskIter<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn pool(classes: usize, per_class: usize) -> Vec<usize> {
        (0..classes * per_class).map(|i| i % classes).collect()
    }

    #[test]
    fn test_way_larger_than_pool_is_configuration_error() {
        let err = CategoriesSampler::new(&pool(3, 10), 5, 4, 2).unwrap_err();
        assert!(matches!(err, MtedlError::Configuration { .. }));
    }

    #[test]
    fn test_short_class_is_insufficient_samples() {
        // class 2 has a single item, every task must select it
        let labels = vec![0, 0, 0, 1, 1, 1, 2];
        let sampler = CategoriesSampler::new(&labels, 1, 3, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        match sampler.sample(&mut rng) {
            Err(MtedlError::InsufficientSamples {
                class,
                available,
                required,
            }) => assert_eq!((class, available, required), (2, 1, 2)),
            other => panic!("expected InsufficientSamples, got {other:?}"),
        }
    }

    #[test]
    fn test_short_class_only_fails_when_drawn() {
        let labels = vec![0, 0, 0, 1, 1, 1, 2];
        let sampler = CategoriesSampler::new(&labels, 1, 2, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let (mut drawn, mut short) = (0, 0);
        for _ in 0..40 {
            match sampler.sample(&mut rng) {
                Ok(task) => {
                    assert!(!task.classes.contains(&2));
                    drawn += 1;
                }
                Err(MtedlError::InsufficientSamples { class, .. }) => {
                    assert_eq!(class, 2);
                    short += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(drawn > 0 && short > 0);
    }

    #[test]
    fn test_iteration_is_lazy_and_restartable() {
        let sampler = CategoriesSampler::new(&pool(10, 20), 4, 5, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let first: Vec<_> = sampler.iter(&mut rng).collect::<Result<_>>().unwrap();
        let second: Vec<_> = sampler.iter(&mut rng).collect::<Result<_>>().unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 4);
        assert_ne!(first, second);
    }

    #[test]
    fn test_rank_major_layout() {
        let task = SampledTask {
            classes: vec![7, 3],
            indices: vec![vec![70, 71, 72], vec![30, 31, 32]],
        };
        assert_eq!(task.grouped(), vec![70, 71, 72, 30, 31, 32]);
        assert_eq!(task.rank_major(), vec![70, 30, 71, 31, 72, 32]);
    }

    proptest! {
        #[test]
        fn prop_tasks_are_balanced_and_distinct(
            seed in 0u64..1000,
            num_classes in 5usize..12,
            way in 1usize..5,
            per_class in 1usize..6,
        ) {
            let labels = pool(num_classes, 6);
            let sampler = CategoriesSampler::new(&labels, 3, way, per_class).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for task in sampler.iter(&mut rng) {
                let task = task.unwrap();
                let distinct: HashSet<_> = task.classes.iter().collect();
                prop_assert_eq!(distinct.len(), way);
                for (class, block) in task.classes.iter().zip(&task.indices) {
                    prop_assert_eq!(block.len(), per_class);
                    let unique: HashSet<_> = block.iter().collect();
                    prop_assert_eq!(unique.len(), per_class);
                    prop_assert!(block.iter().all(|&i| labels[i] == *class));
                }
            }
        }
    }
}
