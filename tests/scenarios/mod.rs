//! Scenario-based tests for gantry

mod cache_keys;
mod conditional_steps;
mod continue_on_error;
mod step_outputs;
mod triggers;
