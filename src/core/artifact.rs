//! Artifacts produced by pipeline stages and the terminal run result

use crate::core::{PipelineError, PipelineStage, ValidationError};
use std::path::{Path, PathBuf};

/// A file written by an external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
    pub content: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len() as u64,
            content,
        }
    }

    /// Read an artifact from disk
    ///
    /// A missing file is reported as a validation failure rather than an
    /// I/O error: the producing tool claimed success without writing output.
    pub async fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::ValidationFailure {
                    path: path.to_path_buf(),
                    reason: ValidationError::Missing,
                });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Terminal value of a pipeline run
#[derive(Debug)]
pub struct PipelineResult {
    pub success: bool,

    /// Stage the run was in when it failed
    pub failed_stage: Option<PipelineStage>,

    /// Validated artifacts, in production order (empty on failure)
    pub artifacts: Vec<PathBuf>,

    pub error: Option<PipelineError>,
}

impl PipelineResult {
    pub fn succeeded(artifacts: Vec<PathBuf>) -> Self {
        Self {
            success: true,
            failed_stage: None,
            artifacts,
            error: None,
        }
    }

    pub fn failed(stage: PipelineStage, error: PipelineError) -> Self {
        Self {
            success: false,
            failed_stage: Some(stage),
            artifacts: Vec::new(),
            error: Some(error),
        }
    }

    /// Name of the step that failed, e.g. `generate`
    pub fn failing_step(&self) -> Option<&'static str> {
        self.failed_stage.map(PipelineStage::pending_step)
    }
}
