//! Test utilities for sbom-pipeline scenarios

#![allow(dead_code)]

use async_trait::async_trait;
use sbom_pipeline::core::config::PipelineConfig;
use sbom_pipeline::execution::{
    ExecutionEngine, ExecutionEvent, ProcessOutput, ProcessRunner, StageCommand, StageKind,
};
use sbom_pipeline::toolchain::{
    CapabilityProbe, Fetcher, ProbeResult, ToolEnvironment, ToolKind, ToolSource,
    ToolchainResolver,
};
use sbom_pipeline::{PipelineError, PipelineResult, PipelineStage, PipelineState};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// CycloneDX document padded to roughly `padding` extra bytes
pub fn cyclonedx_bom(padding: usize) -> String {
    format!(
        r#"{{"bomFormat":"CycloneDX","specVersion":"1.5","padding":"{}"}}"#,
        "x".repeat(padding)
    )
}

/// What a mocked external tool does when invoked
#[derive(Debug, Clone)]
pub enum StageOutcome {
    /// Exit 0 after producing this artifact content
    Writes(String),
    /// Exit 0 without producing anything
    Silent,
    /// Exit with a non-zero code
    Exits { code: i32, stderr: String },
}

impl StageOutcome {
    pub fn writes(content: impl Into<String>) -> Self {
        StageOutcome::Writes(content.into())
    }

    pub fn exits(code: i32, stderr: &str) -> Self {
        StageOutcome::Exits {
            code,
            stderr: stderr.to_string(),
        }
    }
}

/// One recorded process invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: StageCommand,
    /// Whether the npm cache directory existed while the tool ran
    pub cache_existed: bool,
}

/// Process runner that plays back scripted stage outcomes
#[derive(Clone)]
pub struct MockRunner {
    generate: StageOutcome,
    enrich: StageOutcome,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl MockRunner {
    pub fn new(generate: StageOutcome, enrich: StageOutcome) -> Self {
        Self {
            generate,
            enrich,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Both stages produce valid, large-enough SBOMs
    pub fn healthy() -> Self {
        Self::new(
            StageOutcome::writes(cyclonedx_bom(1200)),
            StageOutcome::writes(cyclonedx_bom(1500)),
        )
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invoked_stages(&self) -> Vec<StageKind> {
        self.invocations().iter().map(|i| i.command.kind).collect()
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(
        &self,
        command: &StageCommand,
        _env: &ToolEnvironment,
    ) -> Result<ProcessOutput, PipelineError> {
        let cache_existed = command
            .env("npm_config_cache")
            .map(|dir| Path::new(dir).is_dir())
            .unwrap_or(false);
        self.invocations.lock().unwrap().push(Invocation {
            command: command.clone(),
            cache_existed,
        });

        let outcome = match command.kind {
            StageKind::Generate => &self.generate,
            StageKind::Enrich => &self.enrich,
        };

        match outcome {
            StageOutcome::Writes(content) => match command.kind {
                StageKind::Generate => {
                    std::fs::write(command.sink.path(), content)?;
                    Ok(ProcessOutput::default())
                }
                StageKind::Enrich => Ok(ProcessOutput {
                    code: 0,
                    stdout: content.clone().into_bytes(),
                    stderr: String::new(),
                }),
            },
            StageOutcome::Silent => Ok(ProcessOutput::default()),
            StageOutcome::Exits { code, stderr } => Ok(ProcessOutput {
                code: *code,
                stdout: Vec::new(),
                stderr: stderr.clone(),
            }),
        }
    }
}

/// Probe that treats a file named after the executable as the tool,
/// its content being the `--version` output
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerProbe;

#[async_trait]
impl CapabilityProbe for MarkerProbe {
    async fn probe(&self, kind: ToolKind, env: &ToolEnvironment) -> ProbeResult {
        for dir in env.search_path() {
            let path = dir.join(kind.executable());
            if let Ok(output) = std::fs::read_to_string(&path) {
                if let Some(version) = kind.parse_version(&output) {
                    return ProbeResult::Found { path, version };
                }
            }
        }
        ProbeResult::NotFound
    }
}

/// Write a fake tool that [`MarkerProbe`] will find
pub fn install_marker(dir: &Path, kind: ToolKind, version_output: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(kind.executable()), version_output).unwrap();
}

/// Fetcher serving canned release indexes and "archives" of marker tools
#[derive(Clone, Default)]
pub struct FakeFetcher {
    archives: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
    offline: Arc<AtomicBool>,
}

impl FakeFetcher {
    pub fn downloads(&self) -> usize {
        self.archives.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, PipelineError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PipelineError::download(url, "connection refused"));
        }
        if url.ends_with("/index.json") {
            return Ok(r#"[{"version":"v21.6.0"},{"version":"v20.11.1"},{"version":"v20.9.0"}]"#.to_string());
        }
        if url.ends_with("/info/available_releases") {
            return Ok(r#"{"available_releases":[8,11,17,21],"most_recent_lts":21}"#.to_string());
        }
        Err(PipelineError::download(url, "404 Not Found"))
    }

    async fn fetch_archive(
        &self,
        url: &str,
        dest: &Path,
        _strip_components: usize,
    ) -> Result<(), PipelineError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PipelineError::download(url, "connection refused"));
        }
        self.archives.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        if url.contains("/node-v") {
            install_marker(&dest.join("bin"), ToolKind::Node, "v20.11.1");
        } else if url.contains("/jdk/") {
            let home = if url.contains("/mac/") {
                dest.join("Contents").join("Home")
            } else {
                dest.to_path_buf()
            };
            install_marker(
                &home.join("bin"),
                ToolKind::Java,
                "openjdk version \"17.0.10\" 2024-01-16",
            );
        } else if url.contains("parlay_") {
            install_marker(dest, ToolKind::Parlay, "parlay version 0.3.0");
        } else {
            return Err(PipelineError::download(url, "unexpected archive"));
        }
        Ok(())
    }
}

/// Result of one scenario run
pub struct PipelineRun {
    pub state: PipelineState,
    pub result: PipelineResult,
    pub events: Vec<ExecutionEvent>,
}

impl PipelineRun {
    pub fn transitions(&self) -> Vec<PipelineStage> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::StageTransition { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn tool_sources(&self) -> Vec<(ToolKind, ToolSource)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::ToolResolved { kind, source, .. } => Some((*kind, *source)),
                _ => None,
            })
            .collect()
    }

    pub fn error(&self) -> &PipelineError {
        self.result
            .error
            .as_ref()
            .unwrap_or_else(|| panic!("expected a failed run, got {:?}", self.result))
    }
}

/// A project directory plus a private toolchain directory that survive
/// across runs
pub struct PipelineHarness {
    pub project: TempDir,
    pub toolchains: TempDir,
    pub fetcher: FakeFetcher,
    pub base_env: ToolEnvironment,
    os: String,
    arch: String,
}

impl PipelineHarness {
    pub fn new() -> Self {
        let project = tempfile::tempdir().unwrap();
        // Empty search path: nothing is installed on the "system"
        let base_env = ToolEnvironment::isolated(project.path().join("system-bin"));
        Self {
            project,
            toolchains: tempfile::tempdir().unwrap(),
            fetcher: FakeFetcher::default(),
            base_env,
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        }
    }

    pub fn on_platform(mut self, os: &str, arch: &str) -> Self {
        self.os = os.to_string();
        self.arch = arch.to_string();
        self
    }

    /// Directory on the base search path standing in for system installs
    pub fn system_bin(&self) -> PathBuf {
        self.project.path().join("system-bin")
    }

    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.project_dir = self.project.path().to_path_buf();
        config.toolchain_dir = Some(self.toolchains.path().to_path_buf());
        config
    }

    pub fn sbom_path(&self) -> PathBuf {
        self.config().sbom_path()
    }

    pub fn enriched_path(&self) -> PathBuf {
        self.config().enriched_path()
    }

    pub async fn run(&self, runner: MockRunner) -> PipelineRun {
        self.run_with_config(self.config(), runner).await
    }

    pub async fn run_with_config(&self, config: PipelineConfig, runner: MockRunner) -> PipelineRun {
        let resolver = ToolchainResolver::new(
            MarkerProbe,
            self.fetcher.clone(),
            config.toolchain_dir(),
            config.mirrors.clone(),
        )
        .with_platform(self.os.clone(), self.arch.clone());

        let mut engine = ExecutionEngine::new(config, resolver, runner);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

        let mut state = PipelineState::new();
        let result = engine.execute(&mut state, self.base_env.clone()).await;

        let events = events.lock().unwrap().clone();
        PipelineRun {
            state,
            result,
            events,
        }
    }
}

pub fn assert_succeeded(run: &PipelineRun) {
    assert!(
        run.result.success,
        "expected success, got {:?} at {:?}",
        run.result.error, run.result.failed_stage
    );
    assert_eq!(run.state.stage, PipelineStage::ValidatedFinal);
}

pub fn assert_failed_at(run: &PipelineRun, step: &str) {
    assert!(!run.result.success, "expected failure at {}", step);
    assert_eq!(run.result.failing_step(), Some(step));
    assert_eq!(run.state.stage, PipelineStage::Failed);
    assert!(run.result.artifacts.is_empty());
}
