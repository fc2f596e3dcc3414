mod cli;
mod core;
mod execution;
mod persistence;

use anyhow::{Context, Result};
use cli::commands::{
    CellsCommand, HistoryCommand, ListCommand, RunCommand, ValidateCommand,
};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::config::WorkflowConfig;
use crate::core::{MatrixCell, RunStatus};
use execution::{ExecutionEvent, LoggingActionRunner, MatrixScheduler};
use persistence::{create_summary, HistoryBackend, InMemoryHistory, RunSummary};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_workflow(cmd).await?,
        Command::Validate(cmd) => validate_workflow(cmd)?,
        Command::Cells(cmd) => show_cells(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
        Command::List(cmd) => list_workflows(cmd).await?,
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn default_history() -> Result<Arc<dyn HistoryBackend>> {
    Ok(Arc::new(
        persistence::SqliteRunStore::with_default_path().await?,
    ))
}

#[cfg(not(feature = "sqlite"))]
async fn default_history() -> Result<Arc<dyn HistoryBackend>> {
    Ok(Arc::new(InMemoryHistory::new()))
}

async fn run_workflow(cmd: &RunCommand) -> Result<()> {
    // Load workflow config
    let config = WorkflowConfig::from_file(&cmd.file)
        .context("Failed to load workflow config")?;

    println!("{} Loaded workflow: {}", INFO, style(&config.name).bold());

    let mut workflow = config.to_workflow()?;

    // Gate on trigger filters when an event was given
    if let Some(event_arg) = cmd.event {
        let event = event_arg.to_event(cmd.branch.as_deref());
        if !workflow.triggers.matches(&event) {
            println!(
                "{} Event {:?} does not trigger workflow {}; nothing to do",
                INFO,
                event,
                style(&workflow.name).bold()
            );
            return Ok(());
        }
    }

    // Apply environment overrides
    for (key, value) in &cmd.env {
        workflow.env.insert(key.clone(), value.clone());
        println!(
            "{} Env override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    // Narrow to a single job when requested
    if let Some(job_name) = &cmd.job {
        if workflow.job(job_name).is_none() {
            anyhow::bail!("Workflow '{}' has no job '{}'", workflow.name, job_name);
        }
        workflow.jobs.retain(|job| &job.name == job_name);
    }

    // Set up history
    let store: Arc<dyn HistoryBackend> = if cmd.no_history {
        Arc::new(InMemoryHistory::new())
    } else {
        default_history().await?
    };

    // Create scheduler
    let scheduler = MatrixScheduler::new(LoggingActionRunner, cmd.strategy.into());

    // Ctrl-C cancels the run as a unit
    let cancel = scheduler.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.store(true, Ordering::SeqCst);
        }
    });

    // Console output via progress bar
    let progress = create_progress_bar(workflow.total_cells());
    let progress_handle = progress.clone();
    scheduler
        .add_event_handler(move |event| {
            progress_handle.println(format_execution_event(&event));
            if matches!(event, ExecutionEvent::CellFinished { .. }) {
                progress_handle.inc(1);
            }
        })
        .await;

    // Execute workflow
    println!();
    let report = scheduler.execute(&workflow).await;
    progress.finish_and_clear();

    // Save to history
    let summary = create_summary(&workflow.name, &report);
    if !cmd.no_history {
        store.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    // Print final verdict
    match report.status() {
        RunStatus::Passed => {
            println!(
                "\n{} {} {} ({} cells passed)",
                CHECK,
                style(&workflow.name).bold(),
                style("passed").green(),
                style(report.state.passed_cells).cyan()
            );
        }
        RunStatus::Cancelled => {
            println!(
                "\n{} {} {}",
                WARN,
                style(&workflow.name).bold(),
                style("cancelled").yellow()
            );
            std::process::exit(1);
        }
        _ => {
            println!(
                "\n{} {} {} ({} fatal cells)",
                CROSS,
                style(&workflow.name).bold(),
                style("failed").red(),
                style(report.state.failed_cells).cyan()
            );
            std::process::exit(1);
        }
    }

    Ok(())
}

fn validate_workflow(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating workflow...", INFO);

    let result = WorkflowConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            println!("{} Workflow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Jobs: {}", style(config.job_count()).cyan());

            let workflow = config.to_workflow()?;
            println!("  Cells: {}", style(workflow.total_cells()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn show_cells(cmd: &CellsCommand) -> Result<()> {
    let config = WorkflowConfig::from_file(&cmd.file)
        .context("Failed to load workflow config")?;
    let workflow = config.to_workflow()?;

    let jobs: Vec<_> = workflow
        .jobs
        .iter()
        .filter(|job| cmd.job.as_ref().map(|name| &job.name == name).unwrap_or(true))
        .collect();

    if let Some(job_name) = &cmd.job {
        if jobs.is_empty() {
            anyhow::bail!("Workflow '{}' has no job '{}'", workflow.name, job_name);
        }
    }

    if cmd.json {
        let data: Vec<_> = jobs
            .iter()
            .map(|job| {
                let cells: Vec<String> = match &job.matrix {
                    Some(matrix) => matrix.expand().iter().map(MatrixCell::label).collect(),
                    None => vec![MatrixCell::empty().label()],
                };
                serde_json::json!({
                    "job": job.name,
                    "cell_count": job.cell_count(),
                    "cells": cells,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "jobs": data }))?
        );
        return Ok(());
    }

    for job in jobs {
        println!(
            "{} Job {} ({} cells)",
            INFO,
            style(&job.name).bold(),
            style(job.cell_count()).cyan()
        );
        let cells = match &job.matrix {
            Some(matrix) => matrix.expand(),
            None => vec![MatrixCell::empty()],
        };
        for cell in cells {
            println!("  {}", style(cell.label()).dim());
        }
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = default_history().await?;

    // One specific run by ID
    if let Some(run_id_str) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.verbose)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    // Runs of one workflow, or runs across all of them; either way only
    // the latest `--limit` are shown
    let runs = if let Some(workflow_name) = &cmd.workflow {
        store.list_runs(workflow_name).await?
    } else {
        let workflows = store.list_workflows().await?;
        let mut all_runs = Vec::new();
        for workflow in &workflows {
            all_runs.extend(store.list_runs(workflow).await?);
        }
        all_runs
    };
    let runs = latest_runs(runs, cmd.limit);

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

/// Newest-first runs, capped at `limit`
fn latest_runs(mut runs: Vec<RunSummary>, limit: usize) -> Vec<RunSummary> {
    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    runs.truncate(limit);
    runs
}

async fn list_workflows(cmd: &ListCommand) -> Result<()> {
    let store = default_history().await?;
    let workflows = store.list_workflows().await?;

    if workflows.is_empty() {
        println!("{} No workflows found in history", INFO);
        return Ok(());
    }

    println!("{} Workflows in history:", INFO);

    for workflow_name in &workflows {
        let runs = store.list_runs(workflow_name).await?;

        if cmd.with_counts {
            let passed = runs
                .iter()
                .filter(|r| r.status == RunStatus::Passed)
                .count();
            let failed = runs
                .iter()
                .filter(|r| r.status == RunStatus::Failed)
                .count();
            println!(
                "  {} ({} runs: {} passed, {} failed)",
                style(workflow_name).bold(),
                style(runs.len()).cyan(),
                style(passed).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(workflow_name).bold());
        }
    }

    if cmd.json {
        let mut json_data = Vec::new();
        for workflow in &workflows {
            let runs = store.list_runs(workflow).await.ok();
            json_data.push(serde_json::json!({
                "name": workflow,
                "run_count": runs.as_ref().map(|r| r.len()).unwrap_or(0)
            }));
        }
        let data = serde_json::json!({ "workflows": json_data });
        println!("\n{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Workflow: {}", style(&summary.workflow_name).bold());
    println!("  Status: {}", format_run_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Cells: {} passed, {} failed, {} total",
        style(summary.passed_cells).green(),
        style(summary.failed_cells).red(),
        style(summary.total_cells).cyan()
    );

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
