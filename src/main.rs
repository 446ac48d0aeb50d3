use anyhow::{Context, Result};
use sbom_pipeline::cli::commands::{ResolveCommand, RunCommand, ValidateCommand};
use sbom_pipeline::cli::output::*;
use sbom_pipeline::cli::{Cli, Command};
use sbom_pipeline::core::config::{recognised_env, PipelineConfig};
use sbom_pipeline::{
    Artifact, ArtifactValidator, ExecutionEngine, HttpFetcher, PipelineError, PipelineState,
    SubprocessRunner, SystemProbe, ToolEnvironment, ToolchainResolver,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

type Engine = ExecutionEngine<SystemProbe, HttpFetcher, SubprocessRunner>;

/// A failed command: the step that failed and a one-line reason
struct Failure {
    step: &'static str,
    message: String,
}

impl Failure {
    fn config(error: anyhow::Error) -> Self {
        Self {
            step: "config",
            message: format!("{:#}", error),
        }
    }

    fn pipeline(step: &'static str, error: PipelineError) -> Self {
        Self {
            step,
            message: error.to_string(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::from_args();

    if let Err(e) = init_logging(&cli) {
        eprintln!("sbom-pipeline: {:#}", e);
        std::process::exit(1);
    }

    let outcome = match cli.command() {
        Command::Run(cmd) => run_pipeline(&cli, &cmd).await,
        Command::Resolve(cmd) => resolve_toolchain(&cli, &cmd).await,
        Command::Validate(cmd) => validate_artifact(&cli, &cmd).await,
    };

    if let Err(failure) = outcome {
        eprintln!(
            "sbom-pipeline: {} failed: {}",
            failure.step,
            failure.message.replace('\n', " ")
        );
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    // --quiet leaves the failure diagnostic as the only stderr output
    let log_level = if cli.quiet {
        LevelFilter::OFF
    } else if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")
}

/// File, then process environment, then `--env` overrides
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path).context("Failed to load pipeline config")?,
        None => PipelineConfig::default(),
    };
    config.apply_env(recognised_env(std::env::vars_os())?)?;
    config.apply_env(cli.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    Ok(config)
}

fn build_engine(config: PipelineConfig) -> Engine {
    let resolver = ToolchainResolver::new(
        SystemProbe,
        HttpFetcher::new(),
        config.toolchain_dir(),
        config.mirrors.clone(),
    );
    ExecutionEngine::new(config, resolver, SubprocessRunner)
}

async fn run_pipeline(cli: &Cli, cmd: &RunCommand) -> Result<(), Failure> {
    let mut config = load_config(cli).map_err(Failure::config)?;
    if let Some(dir) = &cmd.project_dir {
        config.project_dir = dir.clone();
    }
    if let Some(project_type) = &cmd.project_type {
        config.project_type = project_type.clone();
    }
    config.validate().map_err(Failure::config)?;

    let mut engine = build_engine(config);
    if !cli.quiet {
        let reporter = ConsoleReporter::new();
        engine.add_event_handler(move |event| reporter.handle(&event));
    }

    let mut state = PipelineState::new();
    let result = engine.execute(&mut state, ToolEnvironment::from_process()).await;

    if !cli.quiet {
        println!("\n{}", format_pipeline_result(&result));
    }

    let step = result.failing_step().unwrap_or("pipeline");
    match result.error {
        None => Ok(()),
        Some(e) => Err(Failure::pipeline(step, e)),
    }
}

async fn resolve_toolchain(cli: &Cli, cmd: &ResolveCommand) -> Result<(), Failure> {
    let config = load_config(cli).map_err(Failure::config)?;
    let install_root = config.toolchain_dir();

    let mut engine = build_engine(config);
    if !cli.quiet && !cmd.json {
        let reporter = ConsoleReporter::new();
        engine.add_event_handler(move |event| reporter.handle(&event));
    }

    let toolchain = engine
        .resolve(ToolEnvironment::from_process())
        .await
        .map_err(|e| Failure::pipeline("toolchain", e))?;

    if cmd.json {
        let tools = toolchain
            .tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "tool": tool.kind,
                    "version": tool.version.to_string(),
                    "source": tool.source.to_string(),
                    "path": tool.path,
                })
            })
            .collect::<Vec<_>>();
        let data = serde_json::json!({ "install_root": install_root, "tools": tools });
        let json = serde_json::to_string_pretty(&data).map_err(|e| Failure::config(e.into()))?;
        println!("{}", json);
    } else if !cli.quiet {
        println!("\n{} Toolchain ready:", INFO);
        println!("{}", format_toolchain(&toolchain));
        if toolchain.downloads() > 0 {
            println!(
                "{} Downloaded {} runtime(s) into {}",
                WARN,
                toolchain.downloads(),
                style(install_root.display()).dim()
            );
        }
    }

    Ok(())
}

async fn validate_artifact(cli: &Cli, cmd: &ValidateCommand) -> Result<(), Failure> {
    let config = load_config(cli).map_err(Failure::config)?;
    let validator = ArtifactValidator::new(
        cmd.min_bytes.unwrap_or(config.validation.min_bytes),
        cmd.marker.clone().unwrap_or(config.validation.marker),
    );

    let artifact = Artifact::load(&cmd.file)
        .await
        .map_err(|e| Failure::pipeline("validate", e))?;
    validator
        .validate(&artifact)
        .map_err(|e| Failure::pipeline("validate", e))?;

    if !cli.quiet {
        println!(
            "{} {} is valid ({} bytes)",
            CHECK,
            style(cmd.file.display()).bold(),
            artifact.size
        );
    }
    Ok(())
}
