//! Test: trigger filters - gating runs on push and pull request events

use crate::helpers::*;
use gantry::core::trigger::TriggerEvent;

const GATED_YAML: &str = r#"
name: gated
on:
  push:
    branches: [master]
  pull_request:
    branches: [master]
jobs:
  build:
    steps:
      - run: "true"
"#;

fn push(branch: &str) -> TriggerEvent {
    TriggerEvent::Push {
        branch: branch.to_string(),
    }
}

fn pull_request(base: &str) -> TriggerEvent {
    TriggerEvent::PullRequest {
        base: base.to_string(),
    }
}

#[test]
fn test_push_to_listed_branch_triggers() {
    let workflow = workflow_from_yaml(GATED_YAML);
    assert!(workflow.triggers.matches(&push("master")));
    assert!(!workflow.triggers.matches(&push("feature/new-parser")));
}

#[test]
fn test_pull_request_filters_on_target_branch() {
    let workflow = workflow_from_yaml(GATED_YAML);
    assert!(workflow.triggers.matches(&pull_request("master")));
    assert!(!workflow.triggers.matches(&pull_request("develop")));
}

#[test]
fn test_workflow_without_on_block_accepts_everything() {
    let workflow = workflow_from_yaml(
        r#"
name: open
jobs:
  build:
    steps:
      - run: "true"
"#,
    );
    assert!(workflow.triggers.matches(&push("anything")));
    assert!(workflow.triggers.matches(&pull_request("anything")));
}

#[test]
fn test_declared_filter_without_branches_accepts_any_branch() {
    let workflow = workflow_from_yaml(
        r#"
name: any-push
on:
  push:
    branches: []
jobs:
  build:
    steps:
      - run: "true"
"#,
    );
    assert!(workflow.triggers.matches(&push("feature/x")));
    // Pull requests were not declared at all, so they never trigger
    assert!(!workflow.triggers.matches(&pull_request("master")));
}
