//! Test utility functions for gantry

use gantry::core::config::WorkflowConfig;
use gantry::core::{CellContext, RunStatus, Workflow};
use gantry::execution::{
    ActionError, ActionOutcome, ActionRunner, CellResult, MatrixScheduler, RunReport,
    SchedulingStrategy,
};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One recorded action invocation, with its `with:` parameters already
/// rendered against the cell that invoked it
#[derive(Debug, Clone)]
pub struct ActionInvocation {
    pub action: String,
    pub with: Vec<(String, String)>,
    pub cell: String,
}

impl ActionInvocation {
    /// Value of one rendered `with:` parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.with
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Mock action runner that records every invocation and can be scripted
/// to fail or produce outputs for specific action names
#[derive(Clone, Default)]
pub struct MockActions {
    invocations: Arc<Mutex<Vec<ActionInvocation>>>,
    failures: Arc<Mutex<HashSet<String>>>,
    outputs: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
}

impl MockActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of this action fail
    pub fn fail_action(&self, action: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(action.to_string());
        }
    }

    /// Make this action report the given output
    pub fn set_output(&self, action: &str, key: &str, value: &str) {
        if let Ok(mut outputs) = self.outputs.lock() {
            outputs
                .entry(action.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
    }

    /// Every recorded invocation, in dispatch order
    pub fn invocations(&self) -> Vec<ActionInvocation> {
        self.invocations
            .lock()
            .map(|i| i.clone())
            .unwrap_or_default()
    }

    /// Recorded invocations of one action
    pub fn invocations_of(&self, action: &str) -> Vec<ActionInvocation> {
        self.invocations()
            .into_iter()
            .filter(|i| i.action == action)
            .collect()
    }
}

#[async_trait]
impl ActionRunner for MockActions {
    async fn run(
        &self,
        action: &str,
        with: &[(String, String)],
        context: &CellContext,
    ) -> Result<ActionOutcome, ActionError> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(ActionInvocation {
                action: action.to_string(),
                with: with.to_vec(),
                cell: context.cell.label(),
            });
        }

        let should_fail = self
            .failures
            .lock()
            .map(|f| f.contains(action))
            .unwrap_or(false);
        if should_fail {
            return Err(ActionError::Failed {
                action: action.to_string(),
                message: "scripted failure".to_string(),
            });
        }

        let outputs = self
            .outputs
            .lock()
            .ok()
            .and_then(|o| o.get(action).cloned())
            .unwrap_or_default();

        Ok(ActionOutcome {
            outputs,
            summary: format!("{} (mocked)", action),
        })
    }
}

/// Parse a workflow from a YAML string
pub fn workflow_from_yaml(yaml: &str) -> Workflow {
    WorkflowConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse workflow YAML: {}", e))
        .to_workflow()
        .unwrap_or_else(|e| panic!("Failed to build workflow: {}", e))
}

/// Run a workflow with a fresh MockActions, sequentially
pub async fn run_workflow(yaml: &str) -> (RunReport, MockActions) {
    run_workflow_with_strategy(yaml, SchedulingStrategy::Sequential).await
}

/// Run a workflow with a fresh MockActions and the given strategy
pub async fn run_workflow_with_strategy(
    yaml: &str,
    strategy: SchedulingStrategy,
) -> (RunReport, MockActions) {
    let actions = MockActions::new();
    let report = run_workflow_with_actions(yaml, actions.clone(), strategy).await;
    (report, actions)
}

/// Run a workflow with a pre-configured MockActions
pub async fn run_workflow_with_actions(
    yaml: &str,
    actions: MockActions,
    strategy: SchedulingStrategy,
) -> RunReport {
    let workflow = workflow_from_yaml(yaml);
    let scheduler = MatrixScheduler::new(actions, strategy);
    scheduler.execute(&workflow).await
}

/// Assert the run passed
pub fn assert_run_passed(report: &RunReport) {
    assert_eq!(
        report.status(),
        RunStatus::Passed,
        "Run should have passed: {} passed, {} failed, {} absorbed",
        report.state.passed_cells,
        report.state.failed_cells,
        report.state.absorbed_cells
    );
}

/// Assert the run failed
pub fn assert_run_failed(report: &RunReport) {
    assert_eq!(
        report.status(),
        RunStatus::Failed,
        "Run should have failed: {} passed, {} failed",
        report.state.passed_cells,
        report.state.failed_cells
    );
}

/// The single cell result of a job expected to have exactly one
pub fn single_cell<'a>(report: &'a RunReport, job_name: &str) -> &'a CellResult {
    let cells = report.cells_for_job(job_name);
    assert_eq!(
        cells.len(),
        1,
        "Job '{}' should have exactly one cell, has {}",
        job_name,
        cells.len()
    );
    cells[0]
}

/// Labels of a job's cells, in dispatch order
pub fn cell_labels(report: &RunReport, job_name: &str) -> Vec<String> {
    report
        .cells_for_job(job_name)
        .iter()
        .map(|c| c.cell.label())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry::core::CellStatus;

    #[tokio::test]
    async fn test_run_workflow_minimal() {
        let (report, _) = run_workflow(
            r#"
name: minimal
jobs:
  build:
    steps:
      - run: "true"
"#,
        )
        .await;

        assert_run_passed(&report);
        assert_eq!(single_cell(&report, "build").status, CellStatus::Passed);
    }

    #[tokio::test]
    async fn test_mock_actions_record_invocations() {
        let actions = MockActions::new();
        actions.set_output("actions/cache@v2", "cache-hit", "false");

        let report = run_workflow_with_actions(
            r#"
name: cached
jobs:
  build:
    steps:
      - uses: actions/cache@v2
        with:
          path: ~/.cache/pip
"#,
            actions.clone(),
            SchedulingStrategy::Sequential,
        )
        .await;

        assert_run_passed(&report);
        let invocations = actions.invocations_of("actions/cache@v2");
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].param("path"), Some("~/.cache/pip"));
    }

    #[tokio::test]
    async fn test_mock_actions_scripted_failure() {
        let actions = MockActions::new();
        actions.fail_action("actions/checkout@v2");

        let report = run_workflow_with_actions(
            r#"
name: broken
jobs:
  build:
    steps:
      - uses: actions/checkout@v2
"#,
            actions,
            SchedulingStrategy::Sequential,
        )
        .await;

        assert_run_failed(&report);
    }
}
