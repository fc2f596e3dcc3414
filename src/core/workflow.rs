//! Workflow domain model

use crate::core::{config::WorkflowConfig, job::Job, trigger::Triggers};
use anyhow::Result;
use std::collections::HashMap;

/// An immutable workflow definition, built once from configuration and
/// read-only thereafter.
#[derive(Debug, Clone)]
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Global environment threaded into every step invocation
    pub env: HashMap<String, String>,

    /// Declared trigger filters
    pub triggers: Triggers,

    /// Jobs in declared order
    pub jobs: Vec<Job>,
}

impl Workflow {
    /// Build a workflow from configuration
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        let jobs = config
            .jobs()?
            .iter()
            .map(|(name, job_config)| Job::from_config(name, job_config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Workflow {
            name: config.name.clone(),
            env: config.env_as_string_map(),
            triggers: config.triggers(),
            jobs,
        })
    }

    /// Get a job by name
    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Total number of cells across all jobs
    pub fn total_cells(&self) -> usize {
        self.jobs.iter().map(Job::cell_count).sum()
    }
}
