//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall run status for a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started
    Pending,
    /// Run is currently executing
    Running,
    /// Every non-continuing cell passed
    Passed,
    /// At least one non-continuing cell failed
    Failed,
    /// Run was cancelled as a unit
    Cancelled,
}

/// Status of a single step within a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Step has not started
    Pending,
    /// Step is currently executing
    Running,
    /// Step exited zero (or its action reported success)
    Succeeded,
    /// Step exited non-zero, timed out, or its action reported failure
    Failed,
    /// Step's condition evaluated false; not an error
    Skipped,
}

impl StepStatus {
    /// Check if the step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

/// Outcome of one matrix cell (one job run on one combination)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStatus {
    /// All executed steps succeeded or were skipped
    Passed,
    /// A step failed; whether this is pipeline-fatal depends on the
    /// cell's continue-on-error flag
    Failed,
    /// Cell was cancelled before finishing its steps
    Cancelled,
}

/// Overall state of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current run status
    pub status: RunStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of dispatched cells across all jobs
    pub total_cells: usize,

    /// Number of cells that passed
    pub passed_cells: usize,

    /// Number of cells that failed fatally
    pub failed_cells: usize,

    /// Number of failed cells absorbed by continue-on-error
    pub absorbed_cells: usize,
}

impl RunState {
    /// Create a new run state
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            total_cells: 0,
            passed_cells: 0,
            failed_cells: 0,
            absorbed_cells: 0,
        }
    }

    /// Mark the run as started
    pub fn start(&mut self, total_cells: usize) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_cells = total_cells;
    }

    /// Mark the run as finished with the given verdict
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    /// Number of cells accounted for so far
    pub fn settled_cells(&self) -> usize {
        self.passed_cells + self.failed_cells + self.absorbed_cells
    }

    /// Calculate progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_cells == 0 {
            return 0.0;
        }
        self.settled_cells() as f64 / self.total_cells as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
