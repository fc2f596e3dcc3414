//! Workflow execution engine

pub mod orchestrator;
pub mod scheduler;
pub mod step_runner;

pub use orchestrator::{CellResult, JobOrchestrator};
pub use scheduler::{
    EventSink, ExecutionEvent, MatrixScheduler, RunReport, SchedulingStrategy,
};
pub use step_runner::{
    ActionError, ActionOutcome, ActionRunner, LoggingActionRunner, StepReport, StepRunner,
};
