//! End-to-end behaviour of a single few-shot task
//!
//! - A 5-way 1-shot task with 15 queries per class and separable evidence
//! - Head adaptation on separable support embeddings
//! - OOD scoring of 75 in-distribution and 75 OOD queries

use approx::assert_abs_diff_eq;
use mtedl::autograd::Tensor;
use mtedl::data::repeat_labels;
use mtedl::edl::{dirichlet_alpha, expected_probability, EdlLossType, EvidentialLoss};
use mtedl::eval::{roc_auc, score_ood_task};
use mtedl::model::{BaseLearner, EvidenceActivation};
use mtedl::train::count_acc;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WAY: usize = 5;
const QUERY: usize = 15;

/// Strong evidence for the true class of each rank-major query row
fn separable_evidence(rows: usize, rng: &mut StdRng) -> Array2<f32> {
    Array2::from_shape_fn((rows, WAY), |(r, c)| {
        if c == r % WAY {
            20.0 + rng.gen_range(0.0..5.0)
        } else {
            rng.gen_range(0.0..0.5)
        }
    })
}

#[test]
fn separable_task_is_classified_and_detected() {
    let mut rng = StdRng::seed_from_u64(2024);
    let labels = repeat_labels(WAY, QUERY);
    assert_eq!(labels.len(), 75);

    let in_alpha = separable_evidence(WAY * QUERY, &mut rng) + 1.0;
    let ood_alpha = Array2::from_shape_fn((WAY * QUERY, WAY), |_| 1.0 + rng.gen_range(0.0..1.0f32));

    let acc = count_acc(&expected_probability(&in_alpha), &labels);
    assert_abs_diff_eq!(acc, 1.0);

    let scores = score_ood_task(&in_alpha, &ood_alpha);
    assert!(scores.differential_entropy > 0.5);
    assert!(scores.mutual_information > 0.5);
    assert!(scores.precision > 0.5);
}

#[test]
fn probabilities_are_normalized_and_alpha_at_least_one() {
    let mut rng = StdRng::seed_from_u64(7);
    let evidence = Tensor::new(separable_evidence(30, &mut rng), false);
    let alpha = dirichlet_alpha(&evidence).to_array();
    assert!(alpha.iter().all(|&a| a >= 1.0));
    for row in expected_probability(&alpha).rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
    }
}

#[test]
fn adapted_head_classifies_separable_queries() {
    let mut rng = StdRng::seed_from_u64(3);
    let prototype = |class: usize, rng: &mut StdRng| -> Vec<f32> {
        (0..WAY)
            .map(|j| (if j == class { 3.0 } else { 0.0 }) + rng.gen_range(-0.2..0.2))
            .collect()
    };

    let support: Vec<f32> = (0..WAY).flat_map(|c| prototype(c, &mut rng)).collect();
    let query_labels = repeat_labels(WAY, QUERY);
    let query: Vec<f32> = query_labels
        .iter()
        .flat_map(|&c| prototype(c, &mut rng))
        .collect();

    let support = Tensor::from_vec(WAY, WAY, support, false);
    let query = Tensor::from_vec(WAY * QUERY, WAY, query, false);

    let head = BaseLearner::with_dims(WAY, WAY, EvidenceActivation::Softplus, &mut rng);
    let before = head.forward(&query).to_array();
    let evidence = head
        .adapt_and_predict(&support, &repeat_labels(WAY, 1), &query, 100, 0.5, false)
        .unwrap();

    let alpha = dirichlet_alpha(&evidence);
    let acc = count_acc(&expected_probability(&alpha.to_array()), &query_labels);
    assert!(acc > 0.9, "accuracy after adaptation: {acc}");
    assert_eq!(head.forward(&query).to_array(), before);

    let loss = EvidentialLoss::new(EdlLossType::Log, WAY, 10)
        .at_epoch(1)
        .compute(&alpha, &query_labels)
        .unwrap();
    assert!(loss.item().is_finite() && loss.item() >= 0.0);
}

#[test]
fn uncertainty_orders_confident_before_flat() {
    // strictly lower precision score (1 / S) for every in-distribution row
    let in_alpha = Array2::from_elem((10, WAY), 10.0f32);
    let ood_alpha = Array2::from_elem((10, WAY), 1.5f32);
    let scores = score_ood_task(&in_alpha, &ood_alpha);
    assert_eq!(scores.precision, 1.0);

    let single_class = roc_auc(&[0.1, 0.2], &[false, false]);
    assert!(single_class.is_nan());
}
