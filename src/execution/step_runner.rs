//! Step runner - executes one declarative step and reports the result

use crate::core::{CellContext, Step, StepAction, StepStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Result of executing one step
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Step display name
    pub step_name: String,

    /// Terminal status
    pub status: StepStatus,

    /// Captured stdout (commands) or action summary (actions)
    pub stdout: String,

    /// Error description when the step failed
    pub error: Option<String>,

    /// Process exit code, when one exists
    pub exit_code: Option<i32>,

    /// Named outputs parsed from stdout or reported by the action
    pub outputs: HashMap<String, String>,

    /// Elapsed wall-clock time
    pub elapsed: Duration,
}

impl StepReport {
    fn skipped(step: &Step) -> Self {
        Self {
            step_name: step.name.clone(),
            status: StepStatus::Skipped,
            stdout: String::new(),
            error: None,
            exit_code: None,
            outputs: HashMap::new(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Error raised by an external action implementation
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action '{action}' failed: {message}")]
    Failed { action: String, message: String },

    #[error("action '{0}' is not available")]
    Unresolved(String),
}

/// What a resolved action reports back
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    /// Named outputs the action produced
    pub outputs: HashMap<String, String>,

    /// One-line summary for the log
    pub summary: String,
}

/// Seam to the external action implementations.
///
/// Resolution and execution of named reusable actions is delegated
/// wholesale; the runner only cares about the reported outcome.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    async fn run(
        &self,
        action: &str,
        with: &[(String, String)],
        context: &CellContext,
    ) -> Result<ActionOutcome, ActionError>;
}

/// Default action runner for local runs: logs the invocation and
/// reports success with no outputs.
pub struct LoggingActionRunner;

#[async_trait]
impl ActionRunner for LoggingActionRunner {
    async fn run(
        &self,
        action: &str,
        with: &[(String, String)],
        _context: &CellContext,
    ) -> Result<ActionOutcome, ActionError> {
        info!("Invoking action {} with {} parameter(s)", action, with.len());
        for (key, value) in with {
            debug!("  with {} = {}", key, value);
        }
        Ok(ActionOutcome {
            outputs: HashMap::new(),
            summary: format!("{} (delegated)", action),
        })
    }
}

/// Executes a single step against a cell context
pub struct StepRunner<A> {
    actions: A,
}

impl<A: ActionRunner> StepRunner<A> {
    pub fn new(actions: A) -> Self {
        Self { actions }
    }

    /// Execute a step and return its report.
    ///
    /// A step whose condition evaluates false on this cell is Skipped,
    /// not Failed, and never blocks later steps.
    pub async fn run(&self, step: &Step, context: &CellContext) -> StepReport {
        if let Some(condition) = &step.condition {
            if !condition.evaluate(&context.variables()) {
                info!("Skipping step '{}' (condition false)", step.name);
                return StepReport::skipped(step);
            }
        }

        info!("Running step '{}'", step.name);
        let started = Instant::now();

        let mut report = match &step.action {
            StepAction::Run { command } => {
                let rendered = context.interpolate(command);
                self.run_command(step, &rendered, context).await
            }
            StepAction::Uses { action, with } => {
                let rendered: Vec<(String, String)> = with
                    .iter()
                    .map(|(key, value)| (key.clone(), context.interpolate(value)))
                    .collect();
                self.run_action(step, action, &rendered, context).await
            }
        };

        report.elapsed = started.elapsed();
        report
    }

    async fn run_command(
        &self,
        step: &Step,
        command: &str,
        context: &CellContext,
    ) -> StepReport {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        };

        cmd.envs(&context.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Spawning shell for step '{}': {}", step.name, command);

        let waited = timeout(Duration::from_secs(step.timeout_secs), cmd.output()).await;

        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Failed to spawn step '{}': {}", step.name, e);
                return StepReport {
                    step_name: step.name.clone(),
                    status: StepStatus::Failed,
                    stdout: String::new(),
                    error: Some(format!("Failed to spawn command: {}", e)),
                    exit_code: None,
                    outputs: HashMap::new(),
                    elapsed: Duration::ZERO,
                };
            }
            Err(_) => {
                warn!(
                    "Step '{}' timed out after {}s",
                    step.name, step.timeout_secs
                );
                return StepReport {
                    step_name: step.name.clone(),
                    status: StepStatus::Failed,
                    stdout: String::new(),
                    error: Some(format!("Timeout after {} seconds", step.timeout_secs)),
                    exit_code: None,
                    outputs: HashMap::new(),
                    elapsed: Duration::ZERO,
                };
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code();

        if output.status.success() {
            let outputs = parse_step_outputs(&stdout);
            StepReport {
                step_name: step.name.clone(),
                status: StepStatus::Succeeded,
                stdout,
                error: None,
                exit_code,
                outputs,
                elapsed: Duration::ZERO,
            }
        } else {
            let error = match exit_code {
                Some(code) => format!("Command exited with code {}", code),
                None => "Command terminated by signal".to_string(),
            };
            let error = if stderr.trim().is_empty() {
                error
            } else {
                format!("{}: {}", error, stderr.trim())
            };
            StepReport {
                step_name: step.name.clone(),
                status: StepStatus::Failed,
                stdout,
                error: Some(error),
                exit_code,
                outputs: HashMap::new(),
                elapsed: Duration::ZERO,
            }
        }
    }

    async fn run_action(
        &self,
        step: &Step,
        action: &str,
        with: &[(String, String)],
        context: &CellContext,
    ) -> StepReport {
        let waited = timeout(
            Duration::from_secs(step.timeout_secs),
            self.actions.run(action, with, context),
        )
        .await;

        match waited {
            Ok(Ok(outcome)) => StepReport {
                step_name: step.name.clone(),
                status: StepStatus::Succeeded,
                stdout: outcome.summary,
                error: None,
                exit_code: Some(0),
                outputs: outcome.outputs,
                elapsed: Duration::ZERO,
            },
            Ok(Err(e)) => {
                warn!("Action failed in step '{}': {}", step.name, e);
                StepReport {
                    step_name: step.name.clone(),
                    status: StepStatus::Failed,
                    stdout: String::new(),
                    error: Some(e.to_string()),
                    exit_code: None,
                    outputs: HashMap::new(),
                    elapsed: Duration::ZERO,
                }
            }
            Err(_) => {
                warn!(
                    "Action in step '{}' timed out after {}s",
                    step.name, step.timeout_secs
                );
                StepReport {
                    step_name: step.name.clone(),
                    status: StepStatus::Failed,
                    stdout: String::new(),
                    error: Some(format!("Timeout after {} seconds", step.timeout_secs)),
                    exit_code: None,
                    outputs: HashMap::new(),
                    elapsed: Duration::ZERO,
                }
            }
        }
    }
}

/// Parse `::set-output name=<key>::<value>` lines from captured stdout
pub fn parse_step_outputs(stdout: &str) -> HashMap<String, String> {
    let mut outputs = HashMap::new();

    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("::set-output name=") {
            if let Some((name, value)) = rest.split_once("::") {
                outputs.insert(name.trim().to_string(), value.to_string());
            }
        }
    }

    outputs
}
