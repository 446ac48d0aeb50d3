//! Capability probes: is a tool runnable, and which version is it?

use crate::core::Version;
use crate::toolchain::{ToolEnvironment, ToolKind};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Outcome of probing for a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Found { path: PathBuf, version: Version },
    NotFound,
}

impl ProbeResult {
    pub fn is_found(&self) -> bool {
        matches!(self, ProbeResult::Found { .. })
    }
}

/// Detects tools within a [`ToolEnvironment`]
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn probe(&self, kind: ToolKind, env: &ToolEnvironment) -> ProbeResult;
}

/// Probe that locates the executable on the search path and runs it
/// with its version flag
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

#[async_trait]
impl CapabilityProbe for SystemProbe {
    async fn probe(&self, kind: ToolKind, env: &ToolEnvironment) -> ProbeResult {
        let Some(path) = env.find_executable(kind.executable()) else {
            debug!("{} not found on search path", kind);
            return ProbeResult::NotFound;
        };

        let mut command = Command::new(&path);
        command.args(kind.version_args()).kill_on_drop(true);
        env.apply_to(&mut command);

        let output = match command.output().await {
            Ok(output) => output,
            Err(e) => {
                debug!("Failed to run {}: {}", path.display(), e);
                return ProbeResult::NotFound;
            }
        };

        if !output.status.success() {
            debug!(
                "{} exited with {}: {}",
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return ProbeResult::NotFound;
        }

        // java -version prints to stderr
        let text = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        match kind.parse_version(&text) {
            Some(version) => {
                debug!("Found {} {} at {}", kind, version, path.display());
                ProbeResult::Found { path, version }
            }
            None => {
                debug!("Could not read {} version from: {}", kind, text.trim());
                ProbeResult::NotFound
            }
        }
    }
}
