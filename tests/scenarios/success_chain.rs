//! Test: Success Chain - generate, validate, enrich, validate

use crate::helpers::*;
use sbom_pipeline::execution::StageKind;
use sbom_pipeline::PipelineStage;

/// A generator writing a padded CycloneDX document lets the run reach enrichment
#[tokio::test]
async fn test_large_bom_reaches_enrichment() {
    let harness = PipelineHarness::new();
    let runner = MockRunner::healthy();

    let run = harness.run(runner.clone()).await;

    assert_succeeded(&run);
    assert_eq!(
        runner.invoked_stages(),
        vec![StageKind::Generate, StageKind::Enrich]
    );
    assert_eq!(
        run.result.artifacts,
        vec![harness.sbom_path(), harness.enriched_path()]
    );
}

/// Transitions follow the state machine in order
#[tokio::test]
async fn test_stage_transitions_in_order() {
    let harness = PipelineHarness::new();

    let run = harness.run(MockRunner::healthy()).await;

    assert_eq!(
        run.transitions(),
        vec![
            PipelineStage::ToolchainReady,
            PipelineStage::Generated,
            PipelineStage::Validated,
            PipelineStage::Enriched,
            PipelineStage::ValidatedFinal,
        ]
    );
    assert!(run.state.completed_at.is_some());
}

/// Enrichment reads the raw SBOM written by generation
#[tokio::test]
async fn test_enrich_consumes_generated_sbom() {
    let harness = PipelineHarness::new();
    let runner = MockRunner::healthy();

    harness.run(runner.clone()).await;

    let invocations = runner.invocations();
    let generate = &invocations[0].command;
    let enrich = &invocations[1].command;

    assert_eq!(generate.program, "npx");
    assert!(generate
        .args
        .contains(&harness.sbom_path().to_string_lossy().into_owned()));
    assert_eq!(enrich.program, "parlay");
    assert_eq!(
        enrich.args.last().map(String::as_str),
        Some(harness.sbom_path().to_str().unwrap())
    );
}

/// Both outputs are rewritten as pretty-printed JSON
#[tokio::test]
async fn test_outputs_are_pretty_printed() {
    let harness = PipelineHarness::new();

    harness.run(MockRunner::healthy()).await;

    for path in [harness.sbom_path(), harness.enriched_path()] {
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n  \""), "{} is not pretty", path.display());
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["bomFormat"], "CycloneDX");
    }
}

/// The npm cache exists while cdxgen runs and is gone afterwards
#[tokio::test]
async fn test_npm_cache_scoped_to_generate_stage() {
    let harness = PipelineHarness::new();
    let runner = MockRunner::healthy();

    harness.run(runner.clone()).await;

    let generate = &runner.invocations()[0];
    assert!(generate.cache_existed);
    let cache = generate.command.env("npm_config_cache").unwrap();
    assert!(!std::path::Path::new(cache).exists());
}

/// Relative output names from the environment land in the project directory
#[tokio::test]
async fn test_env_overrides_output_names() {
    let harness = PipelineHarness::new();
    let mut config = harness.config();
    config
        .apply_env([
            ("SBOM_OUTPUT", "out/raw.json"),
            ("SBOM_ENRICHED_OUTPUT", "out/enriched.json"),
        ])
        .unwrap();
    std::fs::create_dir_all(harness.project.path().join("out")).unwrap();

    let run = harness.run_with_config(config, MockRunner::healthy()).await;

    assert_succeeded(&run);
    assert!(harness.project.path().join("out/raw.json").is_file());
    assert!(harness.project.path().join("out/enriched.json").is_file());
}
