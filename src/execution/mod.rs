//! Pipeline execution: stage commands, subprocesses, validation and the run loop

pub mod engine;
pub mod process;
pub mod runner;
pub mod stage;
pub mod validator;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use process::{ProcessOutput, ProcessRunner, SubprocessRunner};
pub use runner::PipelineRunner;
pub use stage::{enrich_command, generate_command, ArtifactSink, StageCommand, StageKind};
pub use validator::ArtifactValidator;
