//! CLI output formatting

use crate::core::{CellStatus, RunStatus, StepStatus};
use crate::execution::ExecutionEvent;
use crate::persistence::RunSummary;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a progress bar over matrix cells
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(progress_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cells {msg}")
    {
        progress.set_style(progress_style.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::Running => style("RUNNING").yellow().to_string(),
        StepStatus::Succeeded => style("OK").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a run status for display
pub fn format_run_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Passed => style("PASSED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a cell status, marking absorbed failures
pub fn format_cell_status(status: CellStatus, absorbed: bool) -> String {
    match status {
        CellStatus::Passed => style("passed").green().to_string(),
        CellStatus::Failed if absorbed => {
            format!("{} {}", style("failed").red(), style("(absorbed)").dim())
        }
        CellStatus::Failed => style("failed").red().to_string(),
        CellStatus::Cancelled => style("cancelled").yellow().to_string(),
    }
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Passed => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running => SPINNER,
        _ => INFO,
    };

    format!(
        "{} {} - {} - {} ({}/{} cells) - {}",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.workflow_name).bold(),
        format_run_status(summary.status),
        summary.passed_cells,
        summary.total_cells,
        style(format!("{:.0}%", summary.progress * 100.0)).cyan()
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            run_id,
            workflow_name,
            total_cells,
        } => format!(
            "{} Starting workflow {} ({}, {} cells)",
            ROCKET,
            style(workflow_name).bold(),
            style(&run_id.to_string()[..8]).dim(),
            style(total_cells).cyan()
        ),
        ExecutionEvent::JobStarted { job_name, cells } => format!(
            "{} Job {} ({} cells)",
            INFO,
            style(job_name).bold(),
            style(cells).cyan()
        ),
        ExecutionEvent::CellStarted { job_name, cell } => format!(
            "{} {} [{}]",
            SPINNER,
            style(job_name).cyan(),
            style(cell).dim()
        ),
        ExecutionEvent::StepStarted {
            step_name, cell, ..
        } => format!(
            "   {} {} [{}]",
            SPINNER,
            style(step_name).cyan(),
            style(cell).dim()
        ),
        ExecutionEvent::StepFinished {
            step_name,
            status,
            error,
            ..
        } => {
            let icon = match status {
                StepStatus::Succeeded => CHECK,
                StepStatus::Failed => CROSS,
                StepStatus::Skipped => SKIP,
                _ => INFO,
            };
            match error {
                Some(error) => format!(
                    "   {} {}: {}",
                    icon,
                    style(step_name).bold(),
                    style(error).dim()
                ),
                None => format!("   {} {}", icon, style(step_name).bold()),
            }
        }
        ExecutionEvent::CellFinished {
            job_name,
            cell,
            status,
            absorbed,
        } => format!(
            "{} {} [{}] {}",
            match status {
                CellStatus::Passed => CHECK,
                CellStatus::Failed if *absorbed => WARN,
                _ => CROSS,
            },
            style(job_name).bold(),
            style(cell).dim(),
            format_cell_status(*status, *absorbed)
        ),
        ExecutionEvent::RunFinished { run_id, status } => format!(
            "{} Run ({}) {}",
            INFO,
            style(&run_id.to_string()[..8]).dim(),
            format_run_status(*status)
        ),
    }
}
