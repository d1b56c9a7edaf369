//! Tests for CLI parsing and overrides

use super::*;
use crate::config::{DatasetKind, ExperimentConfig, Phase};
use crate::edl::EdlLossType;
use std::path::PathBuf;

#[test]
fn test_parse_run_with_overrides() {
    let cli = parse_args([
        "mtedl",
        "run",
        "exp.yaml",
        "--phase",
        "OOD_test",
        "--dataset",
        "CIFAR-FS",
        "--shot",
        "5",
        "--loss-type",
        "digamma",
        "--meta-lr1",
        "0.0002",
    ])
    .unwrap();

    let Command::Run(args) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.config, Some(PathBuf::from("exp.yaml")));
    assert_eq!(args.phase, Some(Phase::OodTest));
    assert_eq!(args.dataset, Some(DatasetKind::CifarFs));
    assert_eq!(args.shot, Some(5));
    assert_eq!(args.loss_type, Some(EdlLossType::Digamma));
    assert_eq!(args.meta_lr1, Some(0.0002));
}

#[test]
fn test_parse_rejects_unknown_phase() {
    assert!(parse_args(["mtedl", "run", "--phase", "tiered"]).is_err());
}

#[test]
fn test_global_flags() {
    let cli = parse_args(["mtedl", "validate", "exp.yaml", "--verbose"]).unwrap();
    assert!(cli.verbose);
    assert!(!cli.quiet);
    assert!(matches!(cli.command, Command::Validate(_)));
}

#[test]
fn test_info_format() {
    let cli = parse_args(["mtedl", "info", "exp.yaml", "--format", "yaml"]).unwrap();
    let Command::Info(args) = cli.command else {
        panic!("expected info command");
    };
    assert_eq!(args.format, OutputFormat::Yaml);
}

#[test]
fn test_apply_overrides_only_touches_given_fields() {
    let mut config = ExperimentConfig::default();
    let args = RunArgs {
        way: Some(3),
        gamma: Some(0.25),
        meta_checkpoint: Some(PathBuf::from("ckpt/max_acc.json")),
        ..RunArgs::default()
    };
    apply_overrides(&mut config, &args);

    assert_eq!(config.way, 3);
    assert_eq!(config.gamma, 0.25);
    assert_eq!(config.meta_checkpoint, Some(PathBuf::from("ckpt/max_acc.json")));
    assert_eq!(config.shot, ExperimentConfig::default().shot);
    assert_eq!(config.phase, ExperimentConfig::default().phase);
}
