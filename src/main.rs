use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use restartr::config::{GlobalConfig, load_config};
use restartr::domain::{ExitCode, LoopOutcome, WorkflowContract, WorkflowInputs, WorkflowRecord};
use restartr::engine::ScriptedEngine;
use restartr::handlers::HandlerRegistry;
use restartr::runner::RestartLoop;
use restartr::setup::DefaultPreparer;
use restartr::storage::{JsonlStorage, WorkflowStore};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(config: &GlobalConfig) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("restartr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("restartr.log");
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::new();
    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    }
    builder
        .parse_env("RUST_LOG")
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_store(config: &GlobalConfig) -> Result<Arc<WorkflowStore<JsonlStorage>>> {
    let storage = JsonlStorage::new(&config.storage.state_dir)
        .with_context(|| format!("Failed to open state dir {}", config.storage.state_dir.display()))?;
    Ok(Arc::new(WorkflowStore::new(storage)))
}

fn build_loop(config: &GlobalConfig, script: &Path) -> Result<RestartLoop<ScriptedEngine, JsonlStorage>> {
    let engine = ScriptedEngine::from_file(script).with_context(|| format!("Failed to load script {}", script.display()))?;
    let preparer = DefaultPreparer::new(Arc::new(config.pseudos.clone()));
    let runner = RestartLoop::new(
        Arc::new(engine),
        Arc::new(HandlerRegistry::with_builtin()),
        WorkflowContract::siesta_base(),
        open_store(config)?,
        Arc::new(preparer),
    )
    .with_defaults(config.workflow.clone());

    let token = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling workflow");
            token.cancel();
        }
    });
    Ok(runner)
}

fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn print_result(record: &WorkflowRecord) {
    let result = match &record.result {
        Some(LoopOutcome::Finished) => "finished".green(),
        Some(LoopOutcome::Failed { exit_code }) => exit_code.to_string().red(),
        Some(LoopOutcome::Aborted) => "aborted".yellow(),
        None => format!("{:?}", record.state.phase).cyan(),
    };
    println!("{} {} {}", record.id.bold(), record.kind, result);
    println!(
        "  iterations: {}/{}  units: {}  updated: {}",
        record.state.iteration,
        record.state.max_iterations,
        record.units.len(),
        format_ms(record.updated_at)
    );
    for name in record.outputs.keys() {
        println!("  {} {}", "output".green(), name);
    }
    for diagnostic in &record.diagnostics {
        println!("  {} {}", "warning".yellow(), diagnostic);
    }
}

/// Turn a failed workflow into an error so the process exits non-zero.
fn ensure_not_failed(record: &WorkflowRecord) -> Result<()> {
    if let Some(LoopOutcome::Failed { exit_code }) = &record.result {
        eyre::bail!("workflow {} failed: {}", record.id, exit_code);
    }
    Ok(())
}

fn print_reports(record: &WorkflowRecord) {
    for report in &record.reports {
        println!(
            "  {} {} {}",
            format_ms(report.created_at).dimmed(),
            format!("[{}]", report.event_type).dimmed(),
            report.message
        );
    }
}

fn print_units(record: &WorkflowRecord) {
    for unit in record.submitted_units() {
        let outcome = unit.outcome().map_or("in flight", |o| o.label());
        println!(
            "  #{:<3} {} {} {}",
            unit.iteration,
            unit.handle,
            &unit.fingerprint[..unit.fingerprint.len().min(12)],
            outcome
        );
    }
}

async fn handle_run_command(
    cli: &Cli,
    config: &GlobalConfig,
    inputs: &Path,
    script: &Path,
    max_iterations: Option<u32>,
    clean_workdir: bool,
) -> Result<()> {
    let content = fs::read_to_string(inputs).with_context(|| format!("Failed to read {}", inputs.display()))?;
    let mut inputs: WorkflowInputs = serde_yaml::from_str(&content).context("Failed to parse workflow inputs")?;
    if let Some(max) = max_iterations {
        inputs.max_iterations = Some(max);
    }
    if clean_workdir {
        inputs.clean_workdir = Some(true);
    }

    let runner = build_loop(config, script)?;
    let record = runner.start(inputs).await.context("Workflow run failed")?;
    if cli.is_verbose() {
        print_reports(&record);
    }
    print_result(&record);
    ensure_not_failed(&record)
}

async fn handle_resume_command(cli: &Cli, config: &GlobalConfig, id: &str, script: &Path) -> Result<()> {
    let runner = build_loop(config, script)?;
    let record = runner.resume(id).await.context("Workflow resume failed")?;
    if cli.is_verbose() {
        print_reports(&record);
    }
    print_result(&record);
    ensure_not_failed(&record)
}

fn handle_status_command(config: &GlobalConfig, id: &str, detailed: bool) -> Result<()> {
    let record = open_store(config)?.load(id)?;
    print_result(&record);
    print_units(&record);
    if detailed {
        print_reports(&record);
    }
    Ok(())
}

fn handle_list_command(config: &GlobalConfig, unfinished: bool) -> Result<()> {
    let store = open_store(config)?;
    let records = if unfinished { store.find_unfinished()? } else { store.list()? };
    if records.is_empty() {
        println!("{}", "No workflows".dimmed());
    }
    for record in &records {
        print_result(record);
    }
    Ok(())
}

fn handle_exit_codes_command() {
    for code in ExitCode::builtins() {
        let (status, symbol, message) = code.triple();
        println!("{:>4} {} {}", status, symbol.bold(), message);
    }
}

fn handle_handlers_command(kind: Option<&str>) {
    let registry = HandlerRegistry::with_builtin();
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => registry.kinds(),
    };
    for kind in kinds {
        println!("{}", kind.cyan());
        let entries = registry.lookup(kind);
        if entries.is_empty() {
            println!("  {}", "no handlers".dimmed());
        }
        for entry in entries {
            println!("  {:>5} {}", entry.priority, entry.name());
        }
    }
}

async fn run_application(cli: &Cli, config: &GlobalConfig) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            inputs,
            script,
            max_iterations,
            clean_workdir,
        } => handle_run_command(cli, config, inputs, script, *max_iterations, *clean_workdir).await,
        Commands::Resume { id, script } => handle_resume_command(cli, config, id, script).await,
        Commands::Status { id, detailed } => handle_status_command(config, id, *detailed),
        Commands::List { unfinished } => handle_list_command(config, *unfinished),
        Commands::ExitCodes => {
            handle_exit_codes_command();
            Ok(())
        }
        Commands::Handlers { kind } => {
            handle_handlers_command(kind.as_deref());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(result: Option<LoopOutcome>) -> WorkflowRecord {
        let mut record = WorkflowRecord::new("siesta.base", WorkflowInputs::new(json!({}), json!({})), 3, false);
        record.result = result;
        record
    }

    #[test]
    fn test_failed_workflow_is_an_error() {
        let failed = record(Some(LoopOutcome::Failed {
            exit_code: ExitCode::SecondConsecutiveUnhandledFailure,
        }));
        let err = ensure_not_failed(&failed).unwrap_err();
        assert!(err.to_string().contains(&failed.id));
    }

    #[test]
    fn test_finished_and_aborted_are_not_errors() {
        assert!(ensure_not_failed(&record(Some(LoopOutcome::Finished))).is_ok());
        assert!(ensure_not_failed(&record(Some(LoopOutcome::Aborted))).is_ok());
        assert!(ensure_not_failed(&record(None)).is_ok());
    }
}
