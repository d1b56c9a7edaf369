//! Tests for learning rate schedulers

use super::*;
use crate::optim::{Adam, Optimizer, ParamGroups, SGD};
use approx::assert_abs_diff_eq;

#[test]
fn test_step_decay_schedule() {
    let mut scheduler = StepDecayLR::new(0.1, 10, 0.5);
    assert_abs_diff_eq!(scheduler.get_lr(), 0.1, epsilon = 1e-7);

    for _ in 0..9 {
        scheduler.step();
    }
    assert_abs_diff_eq!(scheduler.get_lr(), 0.1, epsilon = 1e-7);

    scheduler.step();
    assert_abs_diff_eq!(scheduler.get_lr(), 0.05, epsilon = 1e-7);

    for _ in 0..10 {
        scheduler.step();
    }
    assert_abs_diff_eq!(scheduler.get_lr(), 0.025, epsilon = 1e-7);
    assert_eq!(scheduler.epoch(), 20);
}

#[test]
fn test_step_decay_zero_step_size_is_constant() {
    let mut scheduler = StepDecayLR::new(0.3, 0, 0.1);
    for _ in 0..5 {
        scheduler.step();
    }
    assert_abs_diff_eq!(scheduler.get_lr(), 0.3, epsilon = 1e-7);
}

#[test]
fn test_step_decay_apply() {
    let mut scheduler = StepDecayLR::new(0.1, 1, 0.1);
    let mut opt = SGD::new(0.1, 0.9);
    scheduler.step();
    scheduler.apply(&mut opt);
    assert_abs_diff_eq!(opt.lr(), 0.01, epsilon = 1e-7);
}

#[test]
fn test_step_decay_scales_each_group_independently() {
    let mut groups = ParamGroups::new();
    groups.push("encoder", Vec::new(), Box::new(Adam::default_params(1e-4)));
    groups.push("heads", Vec::new(), Box::new(Adam::default_params(1e-3)));

    let mut scheduler = StepDecayLR::factor_only(2, 0.5);
    scheduler.step();
    scheduler.step();
    scheduler.apply_groups(&mut groups);

    let lrs = groups.lrs();
    assert_abs_diff_eq!(lrs[0], 5e-5, epsilon = 1e-9);
    assert_abs_diff_eq!(lrs[1], 5e-4, epsilon = 1e-9);
}
