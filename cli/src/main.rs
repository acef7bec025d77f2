//! CLI entrypoint for argos
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod runtime;

use anyhow::{Context, Result, anyhow};
use argos_application::format_result_for_llm;
use argos_domain::{ExecutionContext, Parameters, ToolDefinition, ToolQuery};
use argos_infrastructure::{ConfigLoader, FileConfig};
use argos_presentation::{Cli, Commands, ConsoleFormatter, ProgressReporter};
use clap::Parser;
use runtime::Runtime;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level; RUST_LOG wins when set
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Commands::Config = cli.command {
        for line in ConfigLoader::config_sources() {
            println!("{}", line);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    info!("Starting argos");

    // === Dependency Injection ===
    let runtime = Runtime::build(&config).await?;
    let outcome = run(&cli, &runtime).await;
    runtime.shutdown().await;
    outcome
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("{}", e))
            .context("Failed to load configuration")?
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn run(cli: &Cli, runtime: &Runtime) -> Result<ExitCode> {
    match &cli.command {
        Commands::Scan { json } => {
            let progress = ProgressReporter::for_mode(cli.quiet || *json, "Scanning for hardware...");
            let report = runtime.scanner.scan().await;
            progress.clear();
            if *json {
                println!("{}", ConsoleFormatter::format_scan_json(&report));
            } else {
                println!("{}", ConsoleFormatter::format_scan(&report));
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Status => {
            println!("{}", ConsoleFormatter::format_status(&runtime.resources.status()));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Acquire { device, owner } => {
            let outcome = runtime.resources.acquire(owner, *device).await;
            println!("{}", ConsoleFormatter::format_acquire(*device, owner, &outcome));
            Ok(exit_code(outcome.is_granted()))
        }

        Commands::Release { device, owner } => {
            let outcome = runtime.resources.release(owner, *device).await;
            println!("{}", ConsoleFormatter::format_release(*device, &outcome));
            Ok(exit_code(outcome.is_released()))
        }

        Commands::ForceRelease { device } => {
            let progress = ProgressReporter::for_mode(cli.quiet, format!("Reclaiming {}...", device));
            let outcome = runtime.resources.force_release(*device).await;
            progress.clear();
            print!("{}", ConsoleFormatter::format_force_release(*device, &outcome));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Tools { namespace, search } => {
            let mut query = ToolQuery::new();
            if let Some(namespace) = namespace {
                query = query.namespace(namespace);
            }
            if let Some(search) = search {
                query = query.search(search);
            }
            let tools = runtime.executor.registry().query(&query);
            let refs: Vec<&ToolDefinition> = tools.iter().map(|t| t.as_ref()).collect();
            println!("{}", ConsoleFormatter::format_tools(&refs));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Exec {
            tool,
            params,
            workflow,
        } => {
            let params: Parameters = match params {
                Some(raw) => serde_json::from_str(raw).context("--params must be a JSON object")?,
                None => Parameters::new(),
            };
            let context = workflow
                .as_ref()
                .map(|w| ExecutionContext::new().with_workflow(w));

            let progress = ProgressReporter::for_mode(cli.quiet, format!("Running {}...", tool));
            let result = runtime.executor.execute(tool, params, context.as_ref()).await;
            progress.clear();

            println!("{}", format_result_for_llm(&result));
            Ok(exit_code(result.is_success()))
        }

        Commands::Schemas => {
            let schemas = runtime.executor.generate_tool_schemas(None);
            println!(
                "{}",
                serde_json::to_string_pretty(&schemas).context("Failed to serialize schemas")?
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config => Ok(ExitCode::SUCCESS),
    }
}
