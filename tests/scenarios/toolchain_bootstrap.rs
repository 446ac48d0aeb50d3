//! Test: Toolchain Bootstrap - reuse, download and platform handling

use crate::helpers::*;
use sbom_pipeline::toolchain::{ToolKind, ToolSource};
use sbom_pipeline::PipelineError;

/// Nothing installed: every runtime is downloaded for the host platform
#[tokio::test]
async fn test_first_run_bootstraps_everything() {
    let harness = PipelineHarness::new();

    let run = harness.run(MockRunner::healthy()).await;

    assert_succeeded(&run);
    assert_eq!(harness.fetcher.downloads(), 3);
    assert_eq!(
        harness.fetcher.urls(),
        vec![
            "https://nodejs.org/dist/v20.11.1/node-v20.11.1-linux-x64.tar.gz".to_string(),
            "https://api.adoptium.net/v3/binary/latest/17/ga/linux/x64/jdk/hotspot/normal/eclipse"
                .to_string(),
            "https://github.com/snyk/parlay/releases/latest/download/parlay_Linux_x86_64.tar.gz"
                .to_string(),
        ]
    );
    assert!(run
        .tool_sources()
        .iter()
        .all(|(_, source)| *source == ToolSource::Bootstrapped));
}

/// A second run with an already-bootstrapped toolchain downloads nothing
#[tokio::test]
async fn test_second_run_performs_no_downloads() {
    let harness = PipelineHarness::new();
    harness.run(MockRunner::healthy()).await;
    let after_first = harness.fetcher.downloads();

    // Reuse must not need the network at all
    harness.fetcher.go_offline();
    let run = harness.run(MockRunner::healthy()).await;

    assert_succeeded(&run);
    assert_eq!(harness.fetcher.downloads(), after_first);
    assert_eq!(
        run.tool_sources(),
        vec![
            (ToolKind::Node, ToolSource::Cached),
            (ToolKind::Java, ToolSource::Cached),
            (ToolKind::Parlay, ToolSource::Cached),
        ]
    );
}

/// Runtimes already on the system search path are used as-is
#[tokio::test]
async fn test_system_tools_are_reused() {
    let harness = PipelineHarness::new();
    let bin = harness.system_bin();
    install_marker(&bin, ToolKind::Node, "v22.1.0");
    install_marker(&bin, ToolKind::Java, "openjdk version \"21.0.2\"");
    install_marker(&bin, ToolKind::Parlay, "parlay 0.4.1");

    let run = harness.run(MockRunner::healthy()).await;

    assert_succeeded(&run);
    assert_eq!(harness.fetcher.downloads(), 0);
    assert!(run
        .tool_sources()
        .iter()
        .all(|(_, source)| *source == ToolSource::System));
}

/// Only the runtime that is too old gets bootstrapped
#[tokio::test]
async fn test_outdated_system_tool_is_replaced() {
    let harness = PipelineHarness::new();
    let bin = harness.system_bin();
    install_marker(&bin, ToolKind::Node, "v16.20.2");
    install_marker(&bin, ToolKind::Java, "openjdk version \"17.0.1\"");
    install_marker(&bin, ToolKind::Parlay, "parlay 0.4.1");

    let run = harness.run(MockRunner::healthy()).await;

    assert_succeeded(&run);
    assert_eq!(harness.fetcher.downloads(), 1);
    assert_eq!(
        run.tool_sources(),
        vec![
            (ToolKind::Node, ToolSource::Bootstrapped),
            (ToolKind::Java, ToolSource::System),
            (ToolKind::Parlay, ToolSource::System),
        ]
    );
}

/// Downloads on an unsupported platform fail before anything runs
#[tokio::test]
async fn test_unsupported_platform() {
    let harness = PipelineHarness::new().on_platform("windows", "x86_64");
    let runner = MockRunner::healthy();

    let run = harness.run(runner.clone()).await;

    assert_failed_at(&run, "toolchain");
    match run.error() {
        PipelineError::UnsupportedPlatform { os, arch } => {
            assert_eq!(os, "windows");
            assert_eq!(arch, "x86_64");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(harness.fetcher.downloads(), 0);
    assert!(runner.invocations().is_empty());
}

/// Apple Silicon downloads use the arm64 archives
#[tokio::test]
async fn test_macos_arm64_urls() {
    let harness = PipelineHarness::new().on_platform("macos", "aarch64");

    let run = harness.run(MockRunner::healthy()).await;

    assert_succeeded(&run);
    let urls = harness.fetcher.urls();
    assert_eq!(
        urls[0],
        "https://nodejs.org/dist/v20.11.1/node-v20.11.1-darwin-arm64.tar.gz"
    );
    assert_eq!(
        urls[1],
        "https://api.adoptium.net/v3/binary/latest/17/ga/mac/aarch64/jdk/hotspot/normal/eclipse"
    );
    assert_eq!(
        urls[2],
        "https://github.com/snyk/parlay/releases/latest/download/parlay_Darwin_arm64.tar.gz"
    );

    // JDKs on macOS keep their binaries under Contents/Home
    let java = run
        .events
        .iter()
        .find_map(|e| match e {
            sbom_pipeline::ExecutionEvent::ToolResolved {
                kind: ToolKind::Java,
                path,
                ..
            } => Some(path.clone()),
            _ => None,
        })
        .unwrap();
    assert!(java.ends_with("java-17/Contents/Home/bin/java"));
}
