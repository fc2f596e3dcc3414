//! Core domain models for workflow execution
//!
//! This module defines the fundamental data structures that represent
//! workflows, jobs, steps, matrices, and their configuration.

pub mod condition;
pub mod config;
pub mod context;
pub mod job;
pub mod matrix;
pub mod state;
pub mod trigger;
pub mod workflow;

pub use condition::*;
pub use context::*;
pub use job::*;
pub use matrix::*;
pub use state::*;
pub use trigger::*;
pub use workflow::*;
