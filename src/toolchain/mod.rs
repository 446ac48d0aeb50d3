//! Toolchain resolution and bootstrap
//!
//! Makes sure every required runtime is runnable before the pipeline starts,
//! downloading missing ones into a private directory. Nothing here touches
//! the process environment: the result is an explicit [`ToolEnvironment`]
//! that later stages pass to every subprocess.

pub mod environment;
pub mod fetch;
pub mod platform;
pub mod probe;
pub mod release;
pub mod resolver;

pub use environment::ToolEnvironment;
pub use fetch::{Fetcher, HttpFetcher};
pub use platform::{Arch, Os, Platform};
pub use probe::{CapabilityProbe, ProbeResult, SystemProbe};
pub use release::{Release, ReleaseVersion};
pub use resolver::{ResolvedTool, ResolvedToolchain, ToolSource, ToolchainResolver};

use crate::core::{Version, VersionRequirement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A runtime the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Node,
    Java,
    Parlay,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Node => "node",
            ToolKind::Java => "java",
            ToolKind::Parlay => "parlay",
        }
    }

    /// Executable probed to detect the tool
    pub fn executable(self) -> &'static str {
        self.name()
    }

    /// Arguments that make the executable print its version
    pub fn version_args(self) -> &'static [&'static str] {
        match self {
            ToolKind::Java => &["-version"],
            ToolKind::Node | ToolKind::Parlay => &["--version"],
        }
    }

    /// Extract the version from `--version` output
    pub fn parse_version(self, output: &str) -> Option<Version> {
        let version = Version::extract(output)?;
        match self {
            ToolKind::Java => Some(version.without_legacy_prefix()),
            ToolKind::Node | ToolKind::Parlay => Some(version),
        }
    }

    /// Leading path components to drop when unpacking the release archive
    pub fn strip_components(self) -> usize {
        match self {
            ToolKind::Node | ToolKind::Java => 1,
            ToolKind::Parlay => 0,
        }
    }

    /// Directory holding the executable inside an unpacked install
    pub fn bin_dir(self, install_dir: &Path, os: Os) -> PathBuf {
        match (self, os) {
            (ToolKind::Java, Os::MacOs) => install_dir.join("Contents").join("Home").join("bin"),
            (ToolKind::Node, _) | (ToolKind::Java, _) => install_dir.join("bin"),
            (ToolKind::Parlay, _) => install_dir.to_path_buf(),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared tool version requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequirement {
    pub kind: ToolKind,
    pub version: VersionRequirement,
}

impl ToolRequirement {
    pub fn new(kind: ToolKind, version: VersionRequirement) -> Self {
        Self { kind, version }
    }
}

impl fmt::Display for ToolRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            VersionRequirement::Latest => write!(f, "{}@latest", self.kind),
            VersionRequirement::AtLeast(v) => write!(f, "{}>={}", self.kind, v),
        }
    }
}
