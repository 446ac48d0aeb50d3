//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Pipeline completed successfully
    Completed,
    /// Pipeline failed
    Failed,
}

/// Position of a run in the pipeline state machine
///
/// `Start → ToolchainReady → Generated → Validated → Enriched → ValidatedFinal`,
/// with every non-terminal stage able to move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    ToolchainReady,
    Generated,
    Validated,
    Enriched,
    ValidatedFinal,
    Failed,
}

impl PipelineStage {
    /// The stage that follows on success, if any
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Start => Some(PipelineStage::ToolchainReady),
            PipelineStage::ToolchainReady => Some(PipelineStage::Generated),
            PipelineStage::Generated => Some(PipelineStage::Validated),
            PipelineStage::Validated => Some(PipelineStage::Enriched),
            PipelineStage::Enriched => Some(PipelineStage::ValidatedFinal),
            PipelineStage::ValidatedFinal | PipelineStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::ValidatedFinal | PipelineStage::Failed)
    }

    /// Name of the step that is running while the pipeline sits in this stage
    ///
    /// Used for the diagnostic line when a run fails.
    pub fn pending_step(self) -> &'static str {
        match self {
            PipelineStage::Start => "toolchain",
            PipelineStage::ToolchainReady => "generate",
            PipelineStage::Generated => "validate",
            PipelineStage::Validated => "enrich",
            PipelineStage::Enriched => "validate-final",
            PipelineStage::ValidatedFinal | PipelineStage::Failed => "none",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Start => "START",
            PipelineStage::ToolchainReady => "TOOLCHAIN_READY",
            PipelineStage::Generated => "GENERATED",
            PipelineStage::Validated => "VALIDATED",
            PipelineStage::Enriched => "ENRICHED",
            PipelineStage::ValidatedFinal => "VALIDATED_FINAL",
            PipelineStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Attempted an illegal state machine move
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct TransitionError {
    pub from: PipelineStage,
    pub to: PipelineStage,
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// Current position in the state machine
    pub stage: PipelineStage,

    /// Stage that was being left when the run failed
    pub failed_from: Option<PipelineStage>,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            stage: PipelineStage::Start,
            failed_from: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark pipeline as started
    pub fn start(&mut self) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Move to `to`, which must be the successor of the current stage
    pub fn advance(&mut self, to: PipelineStage) -> Result<(), TransitionError> {
        if self.stage.next() != Some(to) {
            return Err(TransitionError {
                from: self.stage,
                to,
            });
        }

        self.stage = to;
        if to == PipelineStage::ValidatedFinal {
            self.status = ExecutionStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Mark pipeline as failed
    pub fn fail(&mut self) -> Result<(), TransitionError> {
        if self.stage.is_terminal() {
            return Err(TransitionError {
                from: self.stage,
                to: PipelineStage::Failed,
            });
        }

        self.failed_from = Some(self.stage);
        self.stage = PipelineStage::Failed;
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
