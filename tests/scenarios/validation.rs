//! Test: Validation - rejected artifacts terminate the run

use crate::helpers::*;
use sbom_pipeline::execution::StageKind;
use sbom_pipeline::{PipelineError, ValidationError};

fn validation_reason(run: &PipelineRun) -> &ValidationError {
    match run.error() {
        PipelineError::ValidationFailure { reason, .. } => reason,
        other => panic!("expected ValidationFailure, got {:?}", other),
    }
}

/// `{}` has no CycloneDX marker
#[tokio::test]
async fn test_empty_object_fails_validation() {
    let harness = PipelineHarness::new();
    let runner = MockRunner::new(StageOutcome::writes("{}"), StageOutcome::Silent);

    let run = harness.run(runner.clone()).await;

    assert_failed_at(&run, "validate");
    assert_eq!(
        validation_reason(&run),
        &ValidationError::MissingMarker("CycloneDX".to_string())
    );
    assert_eq!(runner.invoked_stages(), vec![StageKind::Generate]);
}

/// Well-formed but tiny documents are rejected
#[tokio::test]
async fn test_small_json_is_rejected() {
    let harness = PipelineHarness::new();
    let runner = MockRunner::new(
        StageOutcome::writes(r#"{"bomFormat":"CycloneDX"}"#),
        StageOutcome::Silent,
    );

    let run = harness.run(runner).await;

    assert_failed_at(&run, "validate");
    assert!(matches!(
        validation_reason(&run),
        ValidationError::TooSmall { minimum: 1024, .. }
    ));
}

/// Exiting 0 without writing the SBOM is a validation failure
#[tokio::test]
async fn test_missing_output_is_rejected() {
    let harness = PipelineHarness::new();
    let runner = MockRunner::new(StageOutcome::Silent, StageOutcome::Silent);

    let run = harness.run(runner).await;

    assert_failed_at(&run, "validate");
    assert_eq!(validation_reason(&run), &ValidationError::Missing);
}

/// A silent generator cannot pass off the previous run's SBOM as its own
#[tokio::test]
async fn test_previous_sbom_is_not_reused() {
    let harness = PipelineHarness::new();
    assert_succeeded(&harness.run(MockRunner::healthy()).await);
    assert!(harness.sbom_path().exists());

    let runner = MockRunner::new(
        StageOutcome::Silent,
        StageOutcome::writes(cyclonedx_bom(1200)),
    );
    let run = harness.run(runner.clone()).await;

    assert_failed_at(&run, "validate");
    assert_eq!(validation_reason(&run), &ValidationError::Missing);
    assert!(!harness.enriched_path().exists());
    assert_eq!(runner.invoked_stages(), vec![StageKind::Generate]);
}

/// An empty enrichment result fails the final validation
#[tokio::test]
async fn test_empty_enrichment_fails_final_validation() {
    let harness = PipelineHarness::new();
    let runner = MockRunner::new(
        StageOutcome::writes(cyclonedx_bom(1200)),
        StageOutcome::writes(""),
    );

    let run = harness.run(runner.clone()).await;

    assert_failed_at(&run, "validate-final");
    assert_eq!(validation_reason(&run), &ValidationError::Empty);
    assert_eq!(
        runner.invoked_stages(),
        vec![StageKind::Generate, StageKind::Enrich]
    );
}

/// SBOM_MIN_BYTES lowers the threshold
#[tokio::test]
async fn test_threshold_from_environment() {
    let harness = PipelineHarness::new();
    let mut config = harness.config();
    config.apply_env([("SBOM_MIN_BYTES", "16")]).unwrap();
    let small = r#"{"bomFormat":"CycloneDX"}"#;

    let run = harness
        .run_with_config(
            config,
            MockRunner::new(StageOutcome::writes(small), StageOutcome::writes(small)),
        )
        .await;

    assert_succeeded(&run);
}
