//! sbom-pipeline - CycloneDX SBOM generation and enrichment with an ephemeral toolchain

pub mod cli;
pub mod core;
pub mod execution;
pub mod toolchain;

// Re-export commonly used types
pub use crate::core::{
    config::PipelineConfig, Artifact, ExecutionStatus, PipelineError, PipelineResult,
    PipelineStage, PipelineState, ValidationError, Version, VersionRequirement,
};
pub use crate::execution::{
    ArtifactValidator, ExecutionEngine, ExecutionEvent, PipelineRunner, ProcessRunner,
    SubprocessRunner,
};
pub use crate::toolchain::{
    CapabilityProbe, Fetcher, HttpFetcher, ProbeResult, SystemProbe, ToolEnvironment, ToolKind,
    ToolchainResolver,
};
