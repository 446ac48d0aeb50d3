//! CLI output formatting

use crate::{
    core::{ExecutionStatus, PipelineResult},
    execution::ExecutionEvent,
    toolchain::{ResolvedToolchain, ToolSource},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for a long-running stage or download
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

fn format_source(source: ToolSource) -> String {
    match source {
        ToolSource::System => style("system").dim().to_string(),
        ToolSource::Cached => style("cached").cyan().to_string(),
        ToolSource::Bootstrapped => style("downloaded").yellow().to_string(),
    }
}

/// Format an execution event for display
///
/// Returns `None` for events that only drive the spinner.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::PipelineStarted { execution_id } => format!(
            "{} Starting SBOM pipeline ({})",
            ROCKET,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::ToolchainResolving { .. } => return None,
        ExecutionEvent::ToolResolving { .. } => return None,
        ExecutionEvent::ToolResolved {
            kind,
            version,
            source,
            path,
        } => format!(
            "{} {} {} ({}) {}",
            CHECK,
            style(kind).bold(),
            style(version).cyan(),
            format_source(*source),
            style(path.display()).dim()
        ),
        ExecutionEvent::StageStarted { .. } => return None,
        ExecutionEvent::StageCompleted { stage, artifact } => format!(
            "{} {} → {}",
            CHECK,
            style(stage).green(),
            style(artifact.display()).dim()
        ),
        ExecutionEvent::ArtifactValidated { path, size } => format!(
            "{} {} valid ({} bytes)",
            CHECK,
            style(path.display()).bold(),
            size
        ),
        ExecutionEvent::StageTransition { .. } => return None,
        ExecutionEvent::PipelineFailed { stage, error } => format!(
            "{} {}: {}",
            CROSS,
            style(stage.pending_step()).red(),
            style(error).dim()
        ),
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => format!(
            "{} Pipeline ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    };
    Some(line)
}

/// Format the final outcome of a run
pub fn format_pipeline_result(result: &PipelineResult) -> String {
    if result.success {
        let artifacts = result
            .artifacts
            .iter()
            .map(|p| format!("\n  {}", style(p.display()).bold()))
            .collect::<String>();
        format!(
            "{} SBOM pipeline completed {}{}",
            CHECK,
            style("successfully").green(),
            artifacts
        )
    } else {
        format!(
            "{} SBOM pipeline {} at {}",
            CROSS,
            style("failed").red(),
            style(result.failing_step().unwrap_or("unknown")).bold()
        )
    }
}

/// Format a resolved toolchain as one line per tool
pub fn format_toolchain(toolchain: &ResolvedToolchain) -> String {
    toolchain
        .tools
        .iter()
        .map(|tool| {
            format!(
                "  {:<7} {:<10} {:<12} {}",
                tool.kind.name(),
                tool.version.to_string(),
                tool.source.to_string(),
                tool.path.display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Event handler printing progress to the terminal
///
/// Shows a spinner while the toolchain resolves or a stage runs.
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::ToolResolving { requirement } => {
                self.start(format!("Resolving {} (downloads if missing)", requirement));
            }
            ExecutionEvent::StageStarted { stage, command } => {
                self.start(format!("{} {}", style(stage).cyan(), style(command).dim()));
            }
            ExecutionEvent::ToolResolved { .. }
            | ExecutionEvent::StageCompleted { .. }
            | ExecutionEvent::PipelineFailed { .. } => self.stop(),
            _ => {}
        }

        if let Some(line) = format_execution_event(event) {
            match self.current() {
                Some(spinner) => spinner.println(line),
                None => println!("{}", line),
            }
        }
    }

    fn start(&self, message: String) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(old) = slot.take() {
                old.finish_and_clear();
            }
            *slot = Some(create_spinner(message));
        }
    }

    fn stop(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }

    fn current(&self) -> Option<ProgressBar> {
        self.spinner.lock().ok().and_then(|slot| slot.clone())
    }
}
