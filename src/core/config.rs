//! Pipeline configuration from YAML and environment variables

use crate::core::version::{Version, VersionRequirement};
use crate::toolchain::{ToolKind, ToolRequirement};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables recognised by [`PipelineConfig::apply_env`]
pub const ENV_KEYS: &[&str] = &[
    "NODE_VERSION",
    "JAVA_VERSION",
    "PARLAY_VERSION",
    "CDXGEN_VERSION",
    "SBOM_OUTPUT",
    "SBOM_ENRICHED_OUTPUT",
    "SBOM_PROJECT_DIR",
    "SBOM_TOOLCHAIN_DIR",
    "SBOM_MIN_BYTES",
];

/// Top-level configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Project to scan
    pub project_dir: PathBuf,

    /// cdxgen project type (`-t`)
    pub project_type: String,

    /// Output file names
    pub output: OutputConfig,

    /// Tool version requirements
    pub tools: ToolsConfig,

    /// Private directory for bootstrapped runtimes
    pub toolchain_dir: Option<PathBuf>,

    /// Artifact sanity checks
    pub validation: ValidationConfig,

    /// Download locations
    pub mirrors: MirrorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Raw SBOM written by the generator
    pub sbom: PathBuf,

    /// Enriched SBOM written from the enricher's stdout
    pub enriched: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub node: VersionRequirement,
    pub java: VersionRequirement,
    pub parlay: VersionRequirement,

    /// npm version tag of `@cyclonedx/cdxgen`
    pub cdxgen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_bytes: u64,
    pub marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Node.js distribution root (contains `index.json`)
    pub node: String,

    /// Adoptium API root
    pub java: String,

    /// Parlay GitHub releases root
    pub parlay: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            project_type: "gradle".to_string(),
            output: OutputConfig::default(),
            tools: ToolsConfig::default(),
            toolchain_dir: None,
            validation: ValidationConfig::default(),
            mirrors: MirrorConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sbom: PathBuf::from("bom.json"),
            enriched: PathBuf::from("bom.enriched.json"),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            node: VersionRequirement::AtLeast(Version::from_major(20)),
            java: VersionRequirement::AtLeast(Version::from_major(17)),
            parlay: VersionRequirement::Latest,
            cdxgen: "latest".to_string(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_bytes: 1024,
            marker: "CycloneDX".to_string(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            node: "https://nodejs.org/dist".to_string(),
            java: "https://api.adoptium.net/v3".to_string(),
            parlay: "https://github.com/snyk/parlay/releases".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.project_type.trim().is_empty() {
            anyhow::bail!("project_type must not be empty");
        }

        if self.validation.marker.is_empty() {
            anyhow::bail!("validation.marker must not be empty");
        }

        if self.tools.cdxgen.trim().is_empty() || self.tools.cdxgen.contains(char::is_whitespace) {
            anyhow::bail!("Invalid cdxgen version: '{}'", self.tools.cdxgen);
        }

        if self.output.sbom == self.output.enriched {
            anyhow::bail!(
                "Raw and enriched SBOM outputs must differ (both are '{}')",
                self.output.sbom.display()
            );
        }

        Ok(())
    }

    /// Overlay environment-style `KEY=VALUE` pairs onto the configuration
    ///
    /// Takes the variables explicitly so callers decide where they come from;
    /// unknown keys are ignored.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "NODE_VERSION" => self.tools.node = parse_requirement(key, value)?,
                "JAVA_VERSION" => self.tools.java = parse_requirement(key, value)?,
                "PARLAY_VERSION" => self.tools.parlay = parse_requirement(key, value)?,
                "CDXGEN_VERSION" => self.tools.cdxgen = value.trim().to_string(),
                "SBOM_OUTPUT" => self.output.sbom = PathBuf::from(value),
                "SBOM_ENRICHED_OUTPUT" => self.output.enriched = PathBuf::from(value),
                "SBOM_PROJECT_DIR" => self.project_dir = PathBuf::from(value),
                "SBOM_TOOLCHAIN_DIR" => self.toolchain_dir = Some(PathBuf::from(value)),
                "SBOM_MIN_BYTES" => {
                    self.validation.min_bytes = value
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid {}: '{}'", key, value))?;
                }
                _ => {}
            }
        }

        self.validate()
    }

    /// Runtime requirements the resolver must satisfy, in resolution order
    pub fn requirements(&self) -> Vec<ToolRequirement> {
        vec![
            ToolRequirement::new(ToolKind::Node, self.tools.node.clone()),
            ToolRequirement::new(ToolKind::Java, self.tools.java.clone()),
            ToolRequirement::new(ToolKind::Parlay, self.tools.parlay.clone()),
        ]
    }

    /// Raw SBOM path, relative outputs resolved against the project directory
    pub fn sbom_path(&self) -> PathBuf {
        self.project_dir.join(&self.output.sbom)
    }

    /// Enriched SBOM path, relative outputs resolved against the project directory
    pub fn enriched_path(&self) -> PathBuf {
        self.project_dir.join(&self.output.enriched)
    }

    /// Directory bootstrapped runtimes are installed into
    pub fn toolchain_dir(&self) -> PathBuf {
        self.toolchain_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("sbom-pipeline")
                .join("toolchains")
        })
    }
}

/// Keep only the recognised variables from a raw process environment
///
/// Unrelated variables may hold anything; a recognised one that is not
/// valid UTF-8 is an error.
pub fn recognised_env<I>(vars: I) -> Result<Vec<(String, String)>>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            let key = key.to_str().filter(|k| ENV_KEYS.contains(k))?.to_string();
            Some(match value.into_string() {
                Ok(value) => Ok((key, value)),
                Err(raw) => Err(anyhow::anyhow!(
                    "{} is not valid UTF-8: {}",
                    key,
                    raw.to_string_lossy()
                )),
            })
        })
        .collect()
}

/// Vendor-tagged values such as Temurin's `jdk-17.0.9+9` fall back to the
/// first version number they contain
fn parse_requirement(key: &str, value: &str) -> Result<VersionRequirement> {
    match value.parse::<VersionRequirement>() {
        Ok(requirement) => Ok(requirement),
        Err(e) => match Version::extract(value) {
            Some(version) => {
                debug!("Reading {}='{}' as {}", key, value, version);
                Ok(VersionRequirement::AtLeast(version))
            }
            None => Err(e).with_context(|| format!("Invalid {}: '{}'", key, value)),
        },
    }
}
