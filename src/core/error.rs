//! Pipeline error types

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that terminate a pipeline run
///
/// None of these are retried: the first one raised ends the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing dependency: {tool} ({reason})")]
    MissingDependency { tool: String, reason: String },

    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailure { url: String, reason: String },

    #[error("{tool} exited with code {code}: {stderr}")]
    ExternalToolFailure {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("Validation failed for {}: {reason}", path.display())]
    ValidationFailure {
        path: PathBuf,
        reason: ValidationError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    State(#[from] crate::core::TransitionError),
}

/// Why an artifact was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("artifact does not exist")]
    Missing,

    #[error("artifact is empty")]
    Empty,

    #[error("artifact does not contain marker '{0}'")]
    MissingMarker(String),

    #[error("artifact is {actual} bytes, expected at least {minimum}")]
    TooSmall { actual: u64, minimum: u64 },

    #[error("artifact is not valid JSON: {0}")]
    NotJson(String),
}

impl PipelineError {
    pub fn missing(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::MissingDependency {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::DownloadFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingDependency { .. } => "missing-dependency",
            PipelineError::UnsupportedPlatform { .. } => "unsupported-platform",
            PipelineError::DownloadFailure { .. } => "download-failure",
            PipelineError::ExternalToolFailure { .. } => "external-tool-failure",
            PipelineError::ValidationFailure { .. } => "validation-failure",
            PipelineError::Io(_) => "io",
            PipelineError::State(_) => "state",
        }
    }
}
