//! Toolchain resolver - finds or bootstraps every required runtime

use crate::core::config::MirrorConfig;
use crate::core::{PipelineError, Version};
use crate::toolchain::release::resolve_release;
use crate::toolchain::{
    CapabilityProbe, Fetcher, Os, Platform, ProbeResult, ToolEnvironment, ToolKind,
    ToolRequirement,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a resolved tool came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    /// Already on the search path
    System,
    /// Bootstrapped by an earlier run
    Cached,
    /// Downloaded by this run
    Bootstrapped,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolSource::System => "system",
            ToolSource::Cached => "cached",
            ToolSource::Bootstrapped => "bootstrapped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub kind: ToolKind,
    pub path: PathBuf,
    pub version: Version,
    pub source: ToolSource,
}

/// Every requirement satisfied, plus the environment that exposes them
#[derive(Debug, Clone)]
pub struct ResolvedToolchain {
    pub tools: Vec<ResolvedTool>,
    pub env: ToolEnvironment,
}

impl ResolvedToolchain {
    pub fn tool(&self, kind: ToolKind) -> Option<&ResolvedTool> {
        self.tools.iter().find(|t| t.kind == kind)
    }

    /// Number of runtimes downloaded by this resolution
    pub fn downloads(&self) -> usize {
        self.tools
            .iter()
            .filter(|t| t.source == ToolSource::Bootstrapped)
            .count()
    }
}

/// Resolves [`ToolRequirement`]s against the environment and the private
/// install directory, downloading whatever is missing
pub struct ToolchainResolver<P, F> {
    probe: P,
    fetcher: F,
    install_root: PathBuf,
    mirrors: MirrorConfig,
    os: String,
    arch: String,
}

impl<P: CapabilityProbe, F: Fetcher> ToolchainResolver<P, F> {
    pub fn new(probe: P, fetcher: F, install_root: impl Into<PathBuf>, mirrors: MirrorConfig) -> Self {
        Self {
            probe,
            fetcher,
            install_root: install_root.into(),
            mirrors,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// Pretend to run on another OS/architecture
    pub fn with_platform(mut self, os: impl Into<String>, arch: impl Into<String>) -> Self {
        self.os = os.into();
        self.arch = arch.into();
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Resolve all requirements in order
    ///
    /// The returned environment is `base` with the bin directory of every
    /// cached or bootstrapped tool prepended.
    pub async fn resolve(
        &self,
        requirements: &[ToolRequirement],
        base: ToolEnvironment,
    ) -> Result<ResolvedToolchain, PipelineError> {
        let mut env = base;
        let mut tools = Vec::with_capacity(requirements.len());

        for requirement in requirements {
            tools.push(self.resolve_tool(requirement, &mut env).await?);
        }

        Ok(ResolvedToolchain { tools, env })
    }

    /// Resolve a single requirement, exposing the result through `env`
    pub async fn resolve_tool(
        &self,
        requirement: &ToolRequirement,
        env: &mut ToolEnvironment,
    ) -> Result<ResolvedTool, PipelineError> {
        let tool = self.resolve_one(requirement, env).await?;
        info!(
            "Using {} {} ({}) at {}",
            tool.kind,
            tool.version,
            tool.source,
            tool.path.display()
        );
        Ok(tool)
    }

    async fn resolve_one(
        &self,
        requirement: &ToolRequirement,
        env: &mut ToolEnvironment,
    ) -> Result<ResolvedTool, PipelineError> {
        let kind = requirement.kind;

        if let Some(os) = self.platform_os() {
            if let Some((install_dir, path, version)) = self.find_installed(requirement, os).await? {
                expose(kind, &install_dir, os, env);
                return Ok(ResolvedTool {
                    kind,
                    path,
                    version,
                    source: ToolSource::Cached,
                });
            }
        }

        match self.probe.probe(kind, env).await {
            ProbeResult::Found { path, version } if requirement.version.is_satisfied_by(&version) => {
                return Ok(ResolvedTool {
                    kind,
                    path,
                    version,
                    source: ToolSource::System,
                });
            }
            ProbeResult::Found { path, version } => {
                info!(
                    "Found {} {} at {} but {} is required",
                    kind,
                    version,
                    path.display(),
                    requirement.version
                );
            }
            ProbeResult::NotFound => info!("{} not found, bootstrapping", kind),
        }

        self.bootstrap(requirement, env).await
    }

    fn platform_os(&self) -> Option<Os> {
        Platform::detect(&self.os, &self.arch).ok().map(|p| p.os)
    }

    /// Highest previously bootstrapped install satisfying `requirement`
    async fn find_installed(
        &self,
        requirement: &ToolRequirement,
        os: Os,
    ) -> Result<Option<(PathBuf, PathBuf, Version)>, PipelineError> {
        let kind = requirement.kind;
        let prefix = format!("{}-", kind.name());

        let mut entries = match tokio::fs::read_dir(&self.install_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && entry.file_type().await?.is_dir() {
                candidates.push(entry.path());
            }
        }
        candidates.sort();

        let mut best: Option<(PathBuf, PathBuf, Version)> = None;
        for install_dir in candidates {
            let bin_dir = kind.bin_dir(&install_dir, os);
            match self.probe.probe(kind, &ToolEnvironment::isolated(&bin_dir)).await {
                ProbeResult::Found { path, version } if requirement.version.is_satisfied_by(&version) => {
                    if best.as_ref().map_or(true, |(_, _, current)| version > *current) {
                        best = Some((install_dir, path, version));
                    }
                }
                ProbeResult::Found { version, .. } => {
                    debug!("Skipping {} {} in {}", kind, version, install_dir.display());
                }
                ProbeResult::NotFound => {
                    debug!("No runnable {} in {}", kind, install_dir.display());
                }
            }
        }

        Ok(best)
    }

    async fn bootstrap(
        &self,
        requirement: &ToolRequirement,
        env: &mut ToolEnvironment,
    ) -> Result<ResolvedTool, PipelineError> {
        let kind = requirement.kind;
        let platform = Platform::detect(&self.os, &self.arch)?;
        let release = resolve_release(requirement, &self.fetcher, &self.mirrors).await?;
        let url = platform.archive_url(&release, &self.mirrors);
        let install_dir = self.install_root.join(release.install_dir_name());

        info!("Bootstrapping {} {} for {}", kind, release.version.label(), platform);

        if tokio::fs::try_exists(&install_dir).await? {
            warn!("Removing stale install at {}", install_dir.display());
            tokio::fs::remove_dir_all(&install_dir).await?;
        }
        tokio::fs::create_dir_all(&install_dir).await?;

        if let Err(e) = self
            .fetcher
            .fetch_archive(&url, &install_dir, kind.strip_components())
            .await
        {
            discard(&install_dir).await;
            return Err(e);
        }

        let bin_dir = kind.bin_dir(&install_dir, platform.os);
        match self.probe.probe(kind, &ToolEnvironment::isolated(&bin_dir)).await {
            ProbeResult::Found { path, version } => {
                expose(kind, &install_dir, platform.os, env);
                Ok(ResolvedTool {
                    kind,
                    path,
                    version,
                    source: ToolSource::Bootstrapped,
                })
            }
            ProbeResult::NotFound => {
                discard(&install_dir).await;
                Err(PipelineError::missing(
                    kind.name(),
                    format!("archive from {} has no runnable {}", url, kind.executable()),
                ))
            }
        }
    }
}

/// Make an install visible to later stages
fn expose(kind: ToolKind, install_dir: &Path, os: Os, env: &mut ToolEnvironment) {
    let bin_dir = kind.bin_dir(install_dir, os);
    if kind == ToolKind::Java {
        if let Some(home) = bin_dir.parent() {
            env.set_var("JAVA_HOME", home.to_string_lossy());
        }
    }
    env.prepend(bin_dir);
}

async fn discard(install_dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(install_dir).await {
        warn!("Failed to remove {}: {}", install_dir.display(), e);
    }
}
