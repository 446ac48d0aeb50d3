//! Sequential stage runner: generate, validate, enrich, validate

use crate::{
    core::{
        config::PipelineConfig, Artifact, ExecutionStatus, PipelineError, PipelineResult,
        PipelineStage, PipelineState, ValidationError,
    },
    execution::{
        enrich_command, generate_command, ArtifactSink, ArtifactValidator, EventHandler,
        ExecutionEvent, ProcessRunner, StageCommand,
    },
    toolchain::ToolEnvironment,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs the artifact-producing stages against a ready toolchain
pub struct PipelineRunner<R> {
    config: PipelineConfig,
    process: R,
    validator: ArtifactValidator,
    event_handlers: Vec<EventHandler>,
}

impl<R: ProcessRunner> PipelineRunner<R> {
    pub fn new(config: PipelineConfig, process: R) -> Self {
        let validator = ArtifactValidator::from_config(&config.validation);
        Self {
            config,
            process,
            validator,
            event_handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn process(&self) -> &R {
        &self.process
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub(crate) fn add_shared_handler(&mut self, handler: EventHandler) {
        self.event_handlers.push(handler);
    }

    /// Emit an event to all handlers
    pub(crate) fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Run every stage from `TOOLCHAIN_READY` to `VALIDATED_FINAL`
    ///
    /// The first failure moves `state` to `FAILED`; later stages never run.
    pub async fn execute(&self, state: &mut PipelineState, env: &ToolEnvironment) -> PipelineResult {
        match self.run_stages(state, env).await {
            Ok(artifacts) => {
                info!("Pipeline finished: {} artifacts", artifacts.len());
                self.emit_event(ExecutionEvent::PipelineCompleted {
                    execution_id: state.execution_id,
                    status: ExecutionStatus::Completed,
                });
                PipelineResult::succeeded(artifacts)
            }
            Err(e) => self.fail(state, e),
        }
    }

    /// Move `state` to `FAILED` and build the failure result
    pub(crate) fn fail(&self, state: &mut PipelineState, error: PipelineError) -> PipelineResult {
        let stage = state.stage;
        error!("{} failed: {}", stage.pending_step(), error);

        if let Err(e) = state.fail() {
            warn!("{}", e);
        }

        self.emit_event(ExecutionEvent::PipelineFailed {
            stage,
            error: error.to_string(),
        });
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id: state.execution_id,
            status: ExecutionStatus::Failed,
        });

        PipelineResult::failed(stage, error)
    }

    async fn run_stages(
        &self,
        state: &mut PipelineState,
        env: &ToolEnvironment,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        // Artifacts from an earlier run must never pass for this run's output
        remove_stale(&self.config.sbom_path()).await?;
        remove_stale(&self.config.enriched_path()).await?;

        let sbom = self.generate(env).await?;
        self.transition(state, PipelineStage::Generated)?;

        self.check(&sbom).await?;
        self.transition(state, PipelineStage::Validated)?;

        let enriched = self.run_stage(&enrich_command(&self.config, &sbom), env).await?;
        self.transition(state, PipelineStage::Enriched)?;

        self.check(&enriched).await?;
        self.transition(state, PipelineStage::ValidatedFinal)?;

        Ok(vec![sbom, enriched])
    }

    fn transition(&self, state: &mut PipelineState, to: PipelineStage) -> Result<(), PipelineError> {
        let from = state.stage;
        state.advance(to)?;
        debug!("{} -> {}", from, to);
        self.emit_event(ExecutionEvent::StageTransition { from, to });
        Ok(())
    }

    /// cdxgen with an npm cache that is removed when the stage ends
    async fn generate(&self, env: &ToolEnvironment) -> Result<PathBuf, PipelineError> {
        let cache = tempfile::Builder::new()
            .prefix("sbom-npm-cache-")
            .tempdir()?;
        let command = generate_command(&self.config, cache.path());

        let result = self.run_stage(&command, env).await;

        let cache_path = cache.path().to_path_buf();
        if let Err(e) = cache.close() {
            warn!("Failed to remove {}: {}", cache_path.display(), e);
        }

        result
    }

    /// Run one external process and return the path of its artifact
    async fn run_stage(
        &self,
        command: &StageCommand,
        env: &ToolEnvironment,
    ) -> Result<PathBuf, PipelineError> {
        let kind = command.kind;
        info!("Running {}: {}", kind, command.display_line());
        self.emit_event(ExecutionEvent::StageStarted {
            stage: kind,
            command: command.display_line(),
        });

        let output = self.process.run(command, env).await?;

        if !output.success() {
            let stderr = output.stderr.trim().to_string();
            error!("{} exited with code {}", kind.tool(), output.code);
            for line in stderr.lines() {
                error!("{}: {}", kind.tool(), line);
            }
            return Err(PipelineError::ExternalToolFailure {
                tool: kind.tool().to_string(),
                code: output.code,
                stderr,
            });
        }

        if let ArtifactSink::Stdout(path) = &command.sink {
            write_artifact(path, &output.stdout).await?;
        }

        self.emit_event(ExecutionEvent::StageCompleted {
            stage: kind,
            artifact: command.sink.path().to_path_buf(),
        });

        Ok(command.sink.path().to_path_buf())
    }

    /// Validate an artifact, then rewrite it as pretty-printed JSON
    async fn check(&self, path: &Path) -> Result<(), PipelineError> {
        let artifact = Artifact::load(path).await?;
        self.validator.validate(&artifact)?;

        let value: serde_json::Value =
            serde_json::from_str(&artifact.content).map_err(|e| PipelineError::ValidationFailure {
                path: path.to_path_buf(),
                reason: ValidationError::NotJson(e.to_string()),
            })?;
        let mut pretty = serde_json::to_string_pretty(&value).map_err(std::io::Error::from)?;
        pretty.push('\n');
        tokio::fs::write(path, pretty).await?;

        info!("Validated {} ({} bytes)", path.display(), artifact.size);
        self.emit_event(ExecutionEvent::ArtifactValidated {
            path: path.to_path_buf(),
            size: artifact.size,
        });
        Ok(())
    }
}

async fn remove_stale(path: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed previous artifact {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn write_artifact(path: &Path, content: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}
