//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run the full pipeline
#[derive(Debug, Args, Clone, Default)]
pub struct RunCommand {
    /// Project to scan (overrides SBOM_PROJECT_DIR)
    #[arg(short, long)]
    pub project_dir: Option<PathBuf>,

    /// cdxgen project type, e.g. gradle, maven, npm
    #[arg(short = 't', long = "type")]
    pub project_type: Option<String>,
}

/// Resolve the toolchain only
#[derive(Debug, Args, Clone, Default)]
pub struct ResolveCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate an existing artifact
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the SBOM file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Minimum size in bytes (defaults to the configured threshold)
    #[arg(long)]
    pub min_bytes: Option<u64>,

    /// Required marker substring (defaults to the configured marker)
    #[arg(long)]
    pub marker: Option<String>,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
