//! Turning a version requirement into a concrete downloadable release

use crate::core::config::MirrorConfig;
use crate::core::{PipelineError, Version, VersionRequirement};
use crate::toolchain::{Fetcher, ToolKind, ToolRequirement};
use serde::Deserialize;
use tracing::debug;

/// Which build of a tool to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseVersion {
    /// A specific version
    Exact(Version),
    /// Newest build of a feature release (Java)
    Feature(u64),
    /// Whatever the vendor marks as latest
    Latest,
}

impl ReleaseVersion {
    /// Text used in URLs and install directory names
    pub fn label(&self) -> String {
        match self {
            ReleaseVersion::Exact(v) => v.to_string(),
            ReleaseVersion::Feature(major) => major.to_string(),
            ReleaseVersion::Latest => "latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub kind: ToolKind,
    pub version: ReleaseVersion,
}

impl Release {
    pub fn new(kind: ToolKind, version: ReleaseVersion) -> Self {
        Self { kind, version }
    }

    /// Directory name under the toolchain root, e.g. `node-20.11.1`
    pub fn install_dir_name(&self) -> String {
        format!("{}-{}", self.kind.name(), self.version.label())
    }
}

#[derive(Debug, Deserialize)]
struct NodeIndexEntry {
    version: String,
}

#[derive(Debug, Deserialize)]
struct AvailableReleases {
    most_recent_lts: u64,
}

/// Pick the release to download for `requirement`
///
/// Only talks to the network when the requirement does not already name a
/// concrete release (Node `latest` or partial versions, Java `latest`).
pub async fn resolve_release<F: Fetcher + ?Sized>(
    requirement: &ToolRequirement,
    fetcher: &F,
    mirrors: &MirrorConfig,
) -> Result<Release, PipelineError> {
    let version = match (requirement.kind, &requirement.version) {
        (ToolKind::Node, VersionRequirement::AtLeast(v)) if v.is_complete() => {
            ReleaseVersion::Exact(*v)
        }
        (ToolKind::Node, req) => {
            let url = format!("{}/index.json", mirrors.node.trim_end_matches('/'));
            let body = fetcher.fetch_text(&url).await?;
            ReleaseVersion::Exact(pick_node_release(&body, req).map_err(|reason| {
                PipelineError::download(url.clone(), reason)
            })?)
        }
        (ToolKind::Java, VersionRequirement::AtLeast(v)) => ReleaseVersion::Feature(v.major),
        (ToolKind::Java, VersionRequirement::Latest) => {
            let url = format!(
                "{}/info/available_releases",
                mirrors.java.trim_end_matches('/')
            );
            let body = fetcher.fetch_text(&url).await?;
            let releases: AvailableReleases = serde_json::from_str(&body)
                .map_err(|e| PipelineError::download(url.clone(), e))?;
            ReleaseVersion::Feature(releases.most_recent_lts)
        }
        (ToolKind::Parlay, VersionRequirement::AtLeast(v)) if v.is_complete() => {
            ReleaseVersion::Exact(*v)
        }
        // Partial Parlay versions cannot be expanded without the GitHub API;
        // the newest release satisfies any minimum.
        (ToolKind::Parlay, _) => ReleaseVersion::Latest,
    };

    let release = Release::new(requirement.kind, version);
    debug!("Resolved {} to release {}", requirement, release.version.label());
    Ok(release)
}

/// Highest version in a Node `index.json` matching the requirement
fn pick_node_release(index: &str, requirement: &VersionRequirement) -> Result<Version, String> {
    let entries: Vec<NodeIndexEntry> =
        serde_json::from_str(index).map_err(|e| format!("invalid release index: {}", e))?;

    entries
        .iter()
        .filter_map(|entry| Version::parse(&entry.version).ok())
        .filter(|candidate| match requirement {
            VersionRequirement::Latest => true,
            VersionRequirement::AtLeast(prefix) => prefix.matches_prefix(candidate),
        })
        .max()
        .ok_or_else(|| format!("no release matches {}", requirement))
}
