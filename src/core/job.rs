//! Job and step domain models

use crate::core::{
    condition::Predicate,
    config::{JobConfig, StepConfig},
    matrix::Matrix,
};
use anyhow::{Context, Result};

/// Default per-step timeout ceiling (seconds)
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 3600;

/// A named, ordered sequence of steps, optionally fanned out over a matrix
#[derive(Debug, Clone)]
pub struct Job {
    /// Job name (the key under `jobs:`)
    pub name: String,

    /// Ordered steps; step N+1 never starts before step N completes
    pub steps: Vec<Step>,

    /// Execution matrix, if declared
    pub matrix: Option<Matrix>,

    /// Per-cell continue-on-error predicate, evaluated once at dispatch
    /// time against the cell's bound values
    pub continue_on_error: Predicate,

    /// Declared job outputs: name -> template rendered from the final
    /// cell context when the job finishes
    pub outputs: Vec<(String, String)>,
}

/// One unit of work within a job
#[derive(Debug, Clone)]
pub struct Step {
    /// Optional id for addressing this step's outputs
    pub id: Option<String>,

    /// Display name
    pub name: String,

    /// What the step does
    pub action: StepAction,

    /// Skip the step (reported as Skipped, not Failed) when this
    /// predicate evaluates false on the current cell
    pub condition: Option<Predicate>,

    /// Timeout ceiling in seconds
    pub timeout_secs: u64,
}

/// The two kinds of declarative step
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Literal shell text, run in a shell; failure is any non-zero exit
    Run { command: String },

    /// Invocation of a named reusable action with named parameters.
    /// The action's implementation is an external collaborator.
    Uses {
        action: String,
        with: Vec<(String, String)>,
    },
}

impl Job {
    /// Build a job from its configuration
    pub fn from_config(name: &str, config: &JobConfig) -> Result<Self> {
        let steps = config
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| Step::from_config(step, index, config.timeout_secs))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid step in job '{}'", name))?;

        let matrix = match &config.strategy {
            Some(strategy) => Some(
                Matrix::from_mapping(&strategy.matrix)
                    .with_context(|| format!("Invalid matrix in job '{}'", name))?,
            ),
            None => None,
        };

        let continue_on_error = config
            .continue_on_error_predicate()
            .with_context(|| format!("Invalid continue-on-error in job '{}'", name))?;

        let outputs = config
            .outputs
            .iter()
            .map(|(key, value)| {
                let key = key
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("Output name must be a string"))?;
                let value = value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        anyhow::anyhow!("Output '{}' must be a string template", key)
                    })?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid outputs in job '{}'", name))?;

        Ok(Job {
            name: name.to_string(),
            steps,
            matrix,
            continue_on_error,
            outputs,
        })
    }

    /// Number of cells this job dispatches (1 for non-matrixed jobs)
    pub fn cell_count(&self) -> usize {
        self.matrix.as_ref().map(Matrix::cell_count).unwrap_or(1)
    }
}

impl Step {
    /// Build a step from its configuration
    pub fn from_config(
        config: &StepConfig,
        index: usize,
        default_timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let action = match (&config.run, &config.uses) {
            (Some(command), None) => StepAction::Run {
                command: command.clone(),
            },
            (None, Some(action)) => {
                let with = config
                    .with
                    .iter()
                    .map(|(key, value)| {
                        let key = key.as_str().map(str::to_string).ok_or_else(|| {
                            anyhow::anyhow!("'with' parameter name must be a string")
                        })?;
                        let value = match value {
                            serde_yaml::Value::String(s) => s.clone(),
                            serde_yaml::Value::Number(n) => n.to_string(),
                            serde_yaml::Value::Bool(b) => b.to_string(),
                            _ => anyhow::bail!(
                                "'with' parameter '{}' must be a scalar",
                                key
                            ),
                        };
                        Ok((key, value))
                    })
                    .collect::<Result<Vec<_>>>()?;

                StepAction::Uses {
                    action: action.clone(),
                    with,
                }
            }
            (Some(_), Some(_)) => {
                anyhow::bail!("Step declares both 'run' and 'uses'")
            }
            (None, None) => {
                anyhow::bail!("Step declares neither 'run' nor 'uses'")
            }
        };

        let condition = config
            .condition
            .as_deref()
            .map(Predicate::parse)
            .transpose()?;

        let name = config.name.clone().unwrap_or_else(|| match &action {
            StepAction::Run { command } => command
                .lines()
                .next()
                .unwrap_or_default()
                .to_string(),
            StepAction::Uses { action, .. } => action.clone(),
        });

        let name = if name.is_empty() {
            format!("step-{}", index + 1)
        } else {
            name
        };

        Ok(Step {
            id: config.id.clone(),
            name,
            action,
            condition,
            timeout_secs: config
                .timeout_secs
                .or(default_timeout_secs)
                .unwrap_or(DEFAULT_STEP_TIMEOUT_SECS),
        })
    }
}
