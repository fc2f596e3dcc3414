//! Matrix scheduler - expands jobs across their matrices and dispatches cells

use crate::core::{
    CellContext, CellStatus, Job, MatrixCell, RunState, RunStatus, StepStatus, Workflow,
};
use crate::execution::orchestrator::{CellResult, JobOrchestrator};
use crate::execution::step_runner::ActionRunner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Strategy for dispatching matrix cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingStrategy {
    /// One cell at a time, in expansion order
    Sequential,

    /// All of a job's cells concurrently
    Parallel,

    /// Bounded concurrency (max N cells in flight)
    LimitedParallel(usize),
}

impl Default for SchedulingStrategy {
    fn default() -> Self {
        SchedulingStrategy::Sequential
    }
}

/// Events that can occur during a workflow run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: Uuid,
        workflow_name: String,
        total_cells: usize,
    },
    JobStarted {
        job_name: String,
        cells: usize,
    },
    CellStarted {
        job_name: String,
        cell: String,
    },
    StepStarted {
        job_name: String,
        cell: String,
        step_name: String,
    },
    StepFinished {
        job_name: String,
        cell: String,
        step_name: String,
        status: StepStatus,
        error: Option<String>,
    },
    CellFinished {
        job_name: String,
        cell: String,
        status: CellStatus,
        absorbed: bool,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Fan-out channel for execution events
#[derive(Clone, Default)]
pub struct EventSink {
    handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl EventSink {
    /// Register a handler
    pub async fn add_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    pub async fn emit(&self, event: ExecutionEvent) {
        let handlers = self.handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }
}

/// Aggregate result of one workflow run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run-level state (id, verdict, timestamps, counters)
    pub state: RunState,

    /// Every dispatched cell's result, in job and expansion order
    pub cells: Vec<CellResult>,
}

impl RunReport {
    /// Final verdict of the run
    pub fn status(&self) -> RunStatus {
        self.state.status
    }

    /// Whole-run pass/fail as surfaced to the platform
    pub fn passed(&self) -> bool {
        self.state.status == RunStatus::Passed
    }

    /// Cell results belonging to one job
    pub fn cells_for_job(&self, job_name: &str) -> Vec<&CellResult> {
        self.cells
            .iter()
            .filter(|c| c.job_name == job_name)
            .collect()
    }
}

/// Dispatches one job orchestrator per matrix cell and aggregates the verdict
pub struct MatrixScheduler<A> {
    orchestrator: Arc<JobOrchestrator<A>>,
    strategy: SchedulingStrategy,
    events: EventSink,
    cancelled: Arc<AtomicBool>,
}

impl<A: ActionRunner + Send + Sync + 'static> MatrixScheduler<A> {
    pub fn new(actions: A, strategy: SchedulingStrategy) -> Self {
        Self {
            orchestrator: Arc::new(JobOrchestrator::new(actions)),
            strategy,
            events: EventSink::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.add_handler(handler).await;
    }

    /// Shared flag cancelling the whole in-flight run as a unit.
    ///
    /// Checked between steps; no partial cancellation of a single step.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Execute every job of the workflow and aggregate the verdict
    pub async fn execute(&self, workflow: &Workflow) -> RunReport {
        let mut state = RunState::new();
        state.start(workflow.total_cells());

        info!(
            "Starting run {} for workflow '{}' ({} cells)",
            state.run_id,
            workflow.name,
            state.total_cells
        );
        self.events
            .emit(ExecutionEvent::RunStarted {
                run_id: state.run_id,
                workflow_name: workflow.name.clone(),
                total_cells: state.total_cells,
            })
            .await;

        let mut cells = Vec::new();
        for job in &workflow.jobs {
            let results = self.execute_job(workflow, job).await;
            for result in &results {
                match result.status {
                    CellStatus::Passed => state.passed_cells += 1,
                    CellStatus::Failed => {
                        if result.continue_on_error {
                            state.absorbed_cells += 1;
                        } else {
                            state.failed_cells += 1;
                        }
                    }
                    CellStatus::Cancelled => {}
                }
            }
            cells.extend(results);
        }

        let status = if self.cancelled.load(Ordering::SeqCst) {
            RunStatus::Cancelled
        } else if cells.iter().any(CellResult::fatal) {
            RunStatus::Failed
        } else {
            RunStatus::Passed
        };
        state.finish(status);

        info!("Run {} finished: {:?}", state.run_id, status);
        self.events
            .emit(ExecutionEvent::RunFinished {
                run_id: state.run_id,
                status,
            })
            .await;

        RunReport { state, cells }
    }

    /// Run one job across its expanded matrix.
    ///
    /// Expansion order is stable (declared dimension and value order);
    /// results come back in that same order regardless of strategy.
    pub async fn execute_job(&self, workflow: &Workflow, job: &Job) -> Vec<CellResult> {
        let cells = match &job.matrix {
            Some(matrix) => matrix.expand(),
            None => vec![MatrixCell::empty()],
        };

        self.events
            .emit(ExecutionEvent::JobStarted {
                job_name: job.name.clone(),
                cells: cells.len(),
            })
            .await;

        // continue-on-error is evaluated once per cell, at dispatch time,
        // against that cell's bound values
        let plan: Vec<(MatrixCell, bool)> = cells
            .into_iter()
            .map(|cell| {
                let vars = CellContext::new(workflow.env.clone(), cell.clone()).variables();
                let absorbed = job.continue_on_error.evaluate(&vars);
                (cell, absorbed)
            })
            .collect();

        let limit = match self.strategy {
            SchedulingStrategy::Sequential => 1,
            SchedulingStrategy::Parallel => plan.len().max(1),
            SchedulingStrategy::LimitedParallel(max) => max.max(1),
        };

        if limit == 1 {
            let mut results = Vec::with_capacity(plan.len());
            for (cell, continue_on_error) in plan {
                results.push(
                    self.dispatch_cell(job, cell, &workflow.env, continue_on_error)
                        .await,
                );
            }
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut join_set = JoinSet::new();

        for (index, (cell, continue_on_error)) in plan.into_iter().enumerate() {
            let orchestrator = self.orchestrator.clone();
            let events = self.events.clone();
            let cancelled = self.cancelled.clone();
            let semaphore = semaphore.clone();
            let job = job.clone();
            let env = workflow.env.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                let cell_label = cell.label();
                events
                    .emit(ExecutionEvent::CellStarted {
                        job_name: job.name.clone(),
                        cell: cell_label.clone(),
                    })
                    .await;

                let result = orchestrator
                    .run_cell(&job, cell, &env, continue_on_error, &cancelled, &events)
                    .await;

                events
                    .emit(ExecutionEvent::CellFinished {
                        job_name: job.name.clone(),
                        cell: cell_label,
                        status: result.status,
                        absorbed: result.failed() && result.continue_on_error,
                    })
                    .await;

                (index, result)
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(pair) => indexed.push(pair),
                Err(e) => warn!("Cell task failed to join: {}", e),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    async fn dispatch_cell(
        &self,
        job: &Job,
        cell: MatrixCell,
        env: &std::collections::HashMap<String, String>,
        continue_on_error: bool,
    ) -> CellResult {
        let cell_label = cell.label();
        self.events
            .emit(ExecutionEvent::CellStarted {
                job_name: job.name.clone(),
                cell: cell_label.clone(),
            })
            .await;

        let result = self
            .orchestrator
            .run_cell(job, cell, env, continue_on_error, &self.cancelled, &self.events)
            .await;

        self.events
            .emit(ExecutionEvent::CellFinished {
                job_name: job.name.clone(),
                cell: cell_label,
                status: result.status,
                absorbed: result.failed() && result.continue_on_error,
            })
            .await;

        result
    }
}
