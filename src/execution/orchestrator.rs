//! Job orchestrator - runs one job's steps in order on one matrix cell

use crate::core::{CellContext, CellStatus, Job, MatrixCell, StepStatus};
use crate::execution::scheduler::{EventSink, ExecutionEvent};
use crate::execution::step_runner::{ActionRunner, StepReport, StepRunner};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Outcome of running one job on one matrix cell
#[derive(Debug, Clone)]
pub struct CellResult {
    /// Owning job name
    pub job_name: String,

    /// The combination this run was bound to
    pub cell: MatrixCell,

    /// Terminal status of the cell
    pub status: CellStatus,

    /// Whether this cell's failure is absorbed at the aggregate boundary
    pub continue_on_error: bool,

    /// Reports for the steps that were dispatched; steps after the first
    /// failure never execute and have no report
    pub steps: Vec<StepReport>,

    /// Declared job outputs, rendered from the final cell context
    pub outputs: HashMap<String, String>,

    /// When the cell started
    pub started_at: DateTime<Utc>,

    /// When the cell finished
    pub finished_at: DateTime<Utc>,
}

impl CellResult {
    /// The cell failed (regardless of continue-on-error)
    pub fn failed(&self) -> bool {
        self.status == CellStatus::Failed
    }

    /// The cell's failure propagates to the pipeline verdict
    pub fn fatal(&self) -> bool {
        self.failed() && !self.continue_on_error
    }

    /// Report for a step by display name, if it was dispatched
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step_name == name)
    }
}

/// Runs the ordered steps of a job within one cell.
///
/// Strictly sequential: step N+1 never starts before step N completes.
/// Stops at the first failed step; the failure is recorded and the
/// remaining steps are not dispatched.
pub struct JobOrchestrator<A> {
    runner: StepRunner<A>,
}

impl<A: ActionRunner> JobOrchestrator<A> {
    pub fn new(actions: A) -> Self {
        Self {
            runner: StepRunner::new(actions),
        }
    }

    /// Run a job on one fully-resolved cell.
    ///
    /// `continue_on_error` has already been evaluated against this cell's
    /// bound values at dispatch time.
    pub async fn run_cell(
        &self,
        job: &Job,
        cell: MatrixCell,
        env: &HashMap<String, String>,
        continue_on_error: bool,
        cancelled: &AtomicBool,
        events: &EventSink,
    ) -> CellResult {
        let started_at = Utc::now();
        let cell_label = cell.label();
        let mut context = CellContext::new(env.clone(), cell.clone());
        let mut reports = Vec::new();
        let mut failed = false;
        let mut was_cancelled = false;

        info!("Job '{}' starting on cell [{}]", job.name, cell_label);

        for step in &job.steps {
            if cancelled.load(Ordering::SeqCst) {
                warn!(
                    "Job '{}' on cell [{}] cancelled before step '{}'",
                    job.name, cell_label, step.name
                );
                was_cancelled = true;
                break;
            }

            events
                .emit(ExecutionEvent::StepStarted {
                    job_name: job.name.clone(),
                    cell: cell_label.clone(),
                    step_name: step.name.clone(),
                })
                .await;

            let report = self.runner.run(step, &context).await;

            events
                .emit(ExecutionEvent::StepFinished {
                    job_name: job.name.clone(),
                    cell: cell_label.clone(),
                    step_name: step.name.clone(),
                    status: report.status,
                    error: report.error.clone(),
                })
                .await;

            let step_failed = report.status == StepStatus::Failed;

            if report.status == StepStatus::Succeeded {
                if let Some(id) = &step.id {
                    context.record_outputs(id, report.outputs.clone());
                }
            }

            reports.push(report);

            if step_failed {
                failed = true;
                break;
            }
        }

        let outputs = job
            .outputs
            .iter()
            .map(|(name, template)| (name.clone(), context.interpolate(template)))
            .collect();

        let status = if was_cancelled {
            CellStatus::Cancelled
        } else if failed {
            CellStatus::Failed
        } else {
            CellStatus::Passed
        };

        info!(
            "Job '{}' on cell [{}] finished: {:?}",
            job.name, cell_label, status
        );

        CellResult {
            job_name: job.name.clone(),
            cell,
            status,
            continue_on_error,
            steps: reports,
            outputs,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
