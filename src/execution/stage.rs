//! External-process stages of the pipeline

use crate::core::config::PipelineConfig;
use std::fmt;
use std::path::{Path, PathBuf};

/// The two artifact-producing stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// cdxgen writes the raw SBOM
    Generate,
    /// Parlay enriches the raw SBOM
    Enrich,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Generate => "generate",
            StageKind::Enrich => "enrich",
        }
    }

    /// Tool name used in error messages
    pub fn tool(self) -> &'static str {
        match self {
            StageKind::Generate => "cdxgen",
            StageKind::Enrich => "parlay",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a stage's artifact ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSink {
    /// The tool writes this file itself
    File(PathBuf),
    /// The tool prints the artifact; stdout is saved to this file
    Stdout(PathBuf),
}

impl ArtifactSink {
    pub fn path(&self) -> &Path {
        match self {
            ArtifactSink::File(path) | ArtifactSink::Stdout(path) => path,
        }
    }
}

/// A single external-process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub kind: StageKind,
    pub program: String,
    pub args: Vec<String>,
    /// Variables set on top of the toolchain environment
    pub envs: Vec<(String, String)>,
    pub sink: ArtifactSink,
}

impl StageCommand {
    /// Render as a shell-like line for logs
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// `npx @cyclonedx/cdxgen` with an npm cache isolated to `cache_dir`
pub fn generate_command(config: &PipelineConfig, cache_dir: &Path) -> StageCommand {
    let output = config.sbom_path();
    StageCommand {
        kind: StageKind::Generate,
        program: "npx".to_string(),
        args: vec![
            "--yes".to_string(),
            format!("@cyclonedx/cdxgen@{}", config.tools.cdxgen),
            "-t".to_string(),
            config.project_type.clone(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            config.project_dir.to_string_lossy().into_owned(),
        ],
        envs: vec![
            (
                "npm_config_cache".to_string(),
                cache_dir.to_string_lossy().into_owned(),
            ),
            ("npm_config_update_notifier".to_string(), "false".to_string()),
        ],
        sink: ArtifactSink::File(output),
    }
}

/// `parlay ecosystems enrich <raw sbom>`, captured from stdout
pub fn enrich_command(config: &PipelineConfig, input: &Path) -> StageCommand {
    StageCommand {
        kind: StageKind::Enrich,
        program: "parlay".to_string(),
        args: vec![
            "ecosystems".to_string(),
            "enrich".to_string(),
            input.to_string_lossy().into_owned(),
        ],
        envs: Vec::new(),
        sink: ArtifactSink::Stdout(config.enriched_path()),
    }
}
