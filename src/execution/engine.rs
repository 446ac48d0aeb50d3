//! Main execution engine - resolves the toolchain, then runs the pipeline

use crate::{
    core::{
        config::PipelineConfig, ExecutionStatus, PipelineError, PipelineResult, PipelineStage,
        PipelineState, Version,
    },
    execution::{PipelineRunner, ProcessRunner, StageKind},
    toolchain::{
        CapabilityProbe, Fetcher, ResolvedToolchain, ToolEnvironment, ToolKind, ToolRequirement,
        ToolSource, ToolchainResolver,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
    },
    ToolchainResolving {
        requirements: Vec<ToolRequirement>,
    },
    ToolResolving {
        requirement: ToolRequirement,
    },
    ToolResolved {
        kind: ToolKind,
        version: Version,
        source: ToolSource,
        path: PathBuf,
    },
    StageStarted {
        stage: StageKind,
        command: String,
    },
    StageCompleted {
        stage: StageKind,
        artifact: PathBuf,
    },
    ArtifactValidated {
        path: PathBuf,
        size: u64,
    },
    StageTransition {
        from: PipelineStage,
        to: PipelineStage,
    },
    PipelineFailed {
        stage: PipelineStage,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Drives one run from `START` to a terminal stage
pub struct ExecutionEngine<P, F, R> {
    resolver: ToolchainResolver<P, F>,
    runner: PipelineRunner<R>,
    requirements: Vec<ToolRequirement>,
}

impl<P, F, R> ExecutionEngine<P, F, R>
where
    P: CapabilityProbe,
    F: Fetcher,
    R: ProcessRunner,
{
    pub fn new(config: PipelineConfig, resolver: ToolchainResolver<P, F>, process: R) -> Self {
        let requirements = config.requirements();
        Self {
            resolver,
            runner: PipelineRunner::new(config, process),
            requirements,
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F2>(&mut self, handler: F2)
    where
        F2: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.runner.add_shared_handler(Arc::new(handler));
    }

    pub fn runner(&self) -> &PipelineRunner<R> {
        &self.runner
    }

    /// Find or bootstrap every required runtime on top of `base`
    pub async fn resolve(&self, base: ToolEnvironment) -> Result<ResolvedToolchain, PipelineError> {
        self.runner.emit_event(ExecutionEvent::ToolchainResolving {
            requirements: self.requirements.clone(),
        });

        let mut env = base;
        let mut tools = Vec::with_capacity(self.requirements.len());
        for requirement in &self.requirements {
            self.runner.emit_event(ExecutionEvent::ToolResolving {
                requirement: requirement.clone(),
            });
            let tool = self.resolver.resolve_tool(requirement, &mut env).await?;
            self.runner.emit_event(ExecutionEvent::ToolResolved {
                kind: tool.kind,
                version: tool.version,
                source: tool.source,
                path: tool.path.clone(),
            });
            tools.push(tool);
        }

        Ok(ResolvedToolchain { tools, env })
    }

    /// Execute the entire pipeline
    pub async fn execute(&self, state: &mut PipelineState, base: ToolEnvironment) -> PipelineResult {
        info!("Starting pipeline execution ({})", state.execution_id);
        state.start();
        self.runner.emit_event(ExecutionEvent::PipelineStarted {
            execution_id: state.execution_id,
        });

        let toolchain = match self.resolve(base).await {
            Ok(toolchain) => toolchain,
            Err(e) => return self.runner.fail(state, e),
        };
        info!(
            "Toolchain ready ({} downloaded, install root {})",
            toolchain.downloads(),
            self.resolver.install_root().display()
        );

        if let Err(e) = state.advance(PipelineStage::ToolchainReady) {
            return self.runner.fail(state, e.into());
        }
        self.runner.emit_event(ExecutionEvent::StageTransition {
            from: PipelineStage::Start,
            to: PipelineStage::ToolchainReady,
        });

        self.runner.execute(state, &toolchain.env).await
    }
}
