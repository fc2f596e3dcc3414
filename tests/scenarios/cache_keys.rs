//! Test: cache keys - interpolated `with:` parameters are deterministic
//! per cell

use crate::helpers::*;
use gantry::execution::SchedulingStrategy;

const CACHE_YAML: &str = r#"
name: cached
jobs:
  tests:
    strategy:
      matrix:
        os: [ubuntu-latest, windows-latest]
        python-version: ["3.7", "3.8"]
    steps:
      - uses: actions/cache@v2
        with:
          path: ~/.cache/pip
          key: tests-${{ matrix.os }}-pip-${{ matrix.python-version }}
"#;

fn rendered_keys(actions: &MockActions) -> Vec<String> {
    actions
        .invocations_of("actions/cache@v2")
        .iter()
        .filter_map(|i| i.param("key").map(str::to_string))
        .collect()
}

/// Every cell renders its own key from its own bindings
#[tokio::test]
async fn test_keys_render_per_cell() {
    let actions = MockActions::new();
    let report = run_workflow_with_actions(
        CACHE_YAML,
        actions.clone(),
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_passed(&report);
    assert_eq!(
        rendered_keys(&actions),
        vec![
            "tests-ubuntu-latest-pip-3.7",
            "tests-ubuntu-latest-pip-3.8",
            "tests-windows-latest-pip-3.7",
            "tests-windows-latest-pip-3.8",
        ]
    );
}

/// The same cell always renders the same key
#[tokio::test]
async fn test_keys_are_deterministic_across_runs() {
    let first = MockActions::new();
    run_workflow_with_actions(CACHE_YAML, first.clone(), SchedulingStrategy::Sequential).await;

    let second = MockActions::new();
    run_workflow_with_actions(CACHE_YAML, second.clone(), SchedulingStrategy::Sequential).await;

    assert_eq!(rendered_keys(&first), rendered_keys(&second));
}

/// Distinct cells always render distinct keys
#[tokio::test]
async fn test_keys_differ_between_cells() {
    let actions = MockActions::new();
    run_workflow_with_actions(CACHE_YAML, actions.clone(), SchedulingStrategy::Sequential).await;

    let keys = rendered_keys(&actions);
    let mut unique = keys.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), keys.len());
}

/// Static `with:` parameters pass through untouched
#[tokio::test]
async fn test_static_params_pass_through() {
    let actions = MockActions::new();
    run_workflow_with_actions(CACHE_YAML, actions.clone(), SchedulingStrategy::Sequential).await;

    for invocation in actions.invocations_of("actions/cache@v2") {
        assert_eq!(invocation.param("path"), Some("~/.cache/pip"));
    }
}
