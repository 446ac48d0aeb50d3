//! Subprocess execution for pipeline stages

use crate::core::PipelineError;
use crate::execution::StageCommand;
use crate::toolchain::ToolEnvironment;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of an external process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (-1 when killed by a signal)
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs one stage command to completion
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        command: &StageCommand,
        env: &ToolEnvironment,
    ) -> Result<ProcessOutput, PipelineError>;
}

/// [`ProcessRunner`] that spawns real subprocesses
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner;

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    /// Spawn the command inside `env` and wait for it to exit
    ///
    /// There is deliberately no timeout: stages block until the tool exits.
    ///
    /// # Errors
    /// Returns `MissingDependency` if the program is not on the search path,
    /// or `Io` if it cannot be spawned.
    async fn run(
        &self,
        command: &StageCommand,
        env: &ToolEnvironment,
    ) -> Result<ProcessOutput, PipelineError> {
        let program = env.find_executable(&command.program).ok_or_else(|| {
            PipelineError::missing(command.program.as_str(), "not found on the toolchain search path")
        })?;

        debug!("Spawning {}: {}", command.kind, command.display_line());

        let mut child = Command::new(&program);
        child
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        env.apply_to(&mut child);
        child.envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let output = child.output().await?;
        let result = ProcessOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            "{} exited with code {} ({} bytes of stdout)",
            command.program,
            result.code,
            result.stdout.len()
        );

        Ok(result)
    }
}
