//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{parse_key_value, ResolveCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Generate and enrich a CycloneDX SBOM with an ephemeral toolchain
#[derive(Debug, Parser, Clone)]
#[command(name = "sbom-pipeline")]
#[command(version)]
#[command(
    about = "Generate, validate and enrich a CycloneDX SBOM using an on-demand toolchain",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Configuration override, same keys as the environment (KEY=VALUE)
    #[arg(short, long = "env", global = true, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve the toolchain and run the full pipeline (default)
    Run(RunCommand),

    /// Resolve or bootstrap the toolchain without running the pipeline
    Resolve(ResolveCommand),

    /// Check an existing SBOM file
    Validate(ValidateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// The subcommand, defaulting to `run`
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(RunCommand::default()))
    }
}
