//! gantry - a matrix-aware CI workflow executor

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use crate::core::{Job, Matrix, MatrixCell, RunStatus, Step, StepStatus, Workflow};
pub use crate::execution::{ExecutionEvent, MatrixScheduler, RunReport, SchedulingStrategy};
