//! Structural sanity checks on produced artifacts

use crate::core::config::ValidationConfig;
use crate::core::{Artifact, PipelineError, ValidationError};

/// Rejects artifacts that are empty, lack the format marker, or are too small
#[derive(Debug, Clone)]
pub struct ArtifactValidator {
    min_bytes: u64,
    marker: String,
}

impl ArtifactValidator {
    pub fn new(min_bytes: u64, marker: impl Into<String>) -> Self {
        Self {
            min_bytes,
            marker: marker.into(),
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.min_bytes, config.marker.clone())
    }

    /// Check an artifact, reporting the first violated rule
    pub fn check(&self, artifact: &Artifact) -> Result<(), ValidationError> {
        if artifact.size == 0 || artifact.content.trim().is_empty() {
            return Err(ValidationError::Empty);
        }

        if !artifact.content.contains(&self.marker) {
            return Err(ValidationError::MissingMarker(self.marker.clone()));
        }

        if artifact.size < self.min_bytes {
            return Err(ValidationError::TooSmall {
                actual: artifact.size,
                minimum: self.min_bytes,
            });
        }

        Ok(())
    }

    /// [`check`](Self::check), wrapped as a pipeline error
    pub fn validate(&self, artifact: &Artifact) -> Result<(), PipelineError> {
        self.check(artifact)
            .map_err(|reason| PipelineError::ValidationFailure {
                path: artifact.path.clone(),
                reason,
            })
    }
}

impl Default for ArtifactValidator {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}
