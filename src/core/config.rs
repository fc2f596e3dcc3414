//! Workflow configuration from YAML

use crate::core::{
    condition::Predicate,
    job::Job,
    trigger::Triggers,
    workflow::Workflow,
};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    pub name: String,

    /// Trigger filters
    #[serde(default, rename = "on")]
    pub on: Option<TriggerConfig>,

    /// Global environment exposed to every step
    #[serde(default)]
    env: std::collections::HashMap<String, Value>,

    /// Jobs, in declared order
    jobs: serde_yaml::Mapping,

    /// Default per-step timeout (seconds), overridable per step
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// `on:` block configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub push: Option<BranchFilter>,

    #[serde(default)]
    pub pull_request: Option<BranchFilter>,
}

/// Branch filter within a trigger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchFilter {
    #[serde(default)]
    pub branches: Vec<String>,
}

/// Job configuration as declared in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Human-readable name (defaults to the job key)
    #[serde(default)]
    pub name: Option<String>,

    /// Ordered steps
    pub steps: Vec<StepConfig>,

    /// Matrix strategy
    #[serde(default)]
    pub strategy: Option<StrategyConfig>,

    /// Bool or predicate string evaluated per cell
    #[serde(default, rename = "continue-on-error")]
    pub continue_on_error: Option<Value>,

    /// Declared job outputs: name -> template
    #[serde(default)]
    pub outputs: serde_yaml::Mapping,

    /// Default per-step timeout for this job (seconds)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// `strategy:` block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Dimension name -> value list, in declared order
    pub matrix: serde_yaml::Mapping,
}

/// Step configuration as declared in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Optional id for addressing this step's outputs
    #[serde(default)]
    pub id: Option<String>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Literal shell text (mutually exclusive with `uses`)
    #[serde(default)]
    pub run: Option<String>,

    /// Reference to a reusable action (mutually exclusive with `run`)
    #[serde(default)]
    pub uses: Option<String>,

    /// Named parameters for `uses` steps
    #[serde(default)]
    pub with: serde_yaml::Mapping,

    /// Skip predicate over the current cell's values
    #[serde(default, rename = "if")]
    pub condition: Option<String>,

    /// Timeout for this step (overrides the job default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// The `matrix.<dim>` key a predicate addresses, when the dimension is
/// not among the declared ones
fn unknown_matrix_dimension<'a>(
    predicate: &'a Predicate,
    dimensions: &[&str],
) -> Option<&'a str> {
    let key = match predicate {
        Predicate::Literal(_) => return None,
        Predicate::Equals { key, .. } | Predicate::NotEquals { key, .. } => key,
    };
    let dimension = key.strip_prefix("matrix.")?;
    if dimensions.contains(&dimension) {
        None
    } else {
        Some(dimension)
    }
}

fn output_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"steps\.([A-Za-z0-9_\-]+)\.outputs\.")
            .unwrap_or_else(|_| unreachable!("output reference regex is literal"))
    })
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse workflow configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Jobs in declared order, deserialized from the raw mapping
    pub fn jobs(&self) -> Result<Vec<(String, JobConfig)>> {
        let mut jobs = Vec::new();

        for (key, value) in &self.jobs {
            let name = key
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("Job name must be a string"))?;
            let job: JobConfig = serde_yaml::from_value(value.clone())
                .with_context(|| format!("Invalid configuration for job '{}'", name))?;
            jobs.push((name, job));
        }

        Ok(jobs)
    }

    /// Number of declared jobs
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Global environment as a string map
    pub fn env_as_string_map(&self) -> std::collections::HashMap<String, String> {
        self.env
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((key.clone(), value))
            })
            .collect()
    }

    /// Declared trigger filters
    pub fn triggers(&self) -> Triggers {
        match &self.on {
            None => Triggers::default(),
            Some(config) => Triggers {
                push_branches: config.push.as_ref().map(|f| f.branches.clone()),
                pull_request_branches: config
                    .pull_request
                    .as_ref()
                    .map(|f| f.branches.clone()),
            },
        }
    }

    /// Validate the workflow configuration
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            anyhow::bail!("Workflow '{}' declares no jobs", self.name);
        }

        for (job_name, job) in self.jobs()? {
            if job.steps.is_empty() {
                anyhow::bail!("Job '{}' has no steps", job_name);
            }

            let mut step_ids = HashSet::new();
            for step in &job.steps {
                if let Some(id) = &step.id {
                    if !step_ids.insert(id.clone()) {
                        anyhow::bail!("Duplicate step id '{}' in job '{}'", id, job_name);
                    }
                }
                if step.run.is_some() && !step.with.is_empty() {
                    anyhow::bail!(
                        "Step in job '{}' declares 'with' parameters on a 'run' step",
                        job_name
                    );
                }
            }

            // Output templates may only address declared step ids
            for (key, value) in &job.outputs {
                let output_name = key.as_str().unwrap_or("<non-string>");
                if let Some(template) = value.as_str() {
                    for captures in output_reference_re().captures_iter(template) {
                        let step_id = &captures[1];
                        if !step_ids.contains(step_id) {
                            anyhow::bail!(
                                "Output '{}' in job '{}' references unknown step '{}'",
                                output_name,
                                job_name,
                                step_id
                            );
                        }
                    }
                }
            }

            // Compiling the full job surfaces matrix, predicate, and
            // parameter errors at load time
            let compiled = Job::from_config(&job_name, &job)?;

            // Predicates on a matrixed job may only address declared
            // dimensions; an unknown dimension would silently compare
            // against the empty string
            if let Some(matrix) = &compiled.matrix {
                let dimensions = matrix.dimension_names();

                if let Some(dimension) =
                    unknown_matrix_dimension(&compiled.continue_on_error, &dimensions)
                {
                    anyhow::bail!(
                        "continue-on-error in job '{}' references unknown matrix dimension '{}'",
                        job_name,
                        dimension
                    );
                }

                for step in &compiled.steps {
                    if let Some(condition) = &step.condition {
                        if let Some(dimension) =
                            unknown_matrix_dimension(condition, &dimensions)
                        {
                            anyhow::bail!(
                                "Condition on step '{}' in job '{}' references unknown matrix dimension '{}'",
                                step.name,
                                job_name,
                                dimension
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Convert the config into the immutable workflow domain model
    pub fn to_workflow(&self) -> Result<Workflow> {
        Workflow::from_config(self)
    }
}

impl JobConfig {
    /// Compile the continue-on-error declaration into a predicate.
    ///
    /// Accepts a YAML bool (constant predicate) or an expression string;
    /// absent means `false`.
    pub fn continue_on_error_predicate(&self) -> Result<Predicate> {
        match &self.continue_on_error {
            None => Ok(Predicate::Literal(false)),
            Some(Value::Bool(flag)) => Ok(Predicate::Literal(*flag)),
            Some(Value::String(expr)) => Ok(Predicate::parse(expr)?),
            Some(other) => anyhow::bail!(
                "continue-on-error must be a bool or a predicate string, got {:?}",
                other
            ),
        }
    }
}
