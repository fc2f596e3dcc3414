//! Test: conditional steps - `if:` predicates over cell bindings

use crate::helpers::*;
use gantry::core::{CellStatus, StepStatus};
use gantry::execution::SchedulingStrategy;

/// A step runs only on the cells its condition selects; elsewhere it is
/// skipped, not failed, and later steps still run
#[tokio::test]
async fn test_step_skipped_on_non_matching_cells() {
    let (report, _) = run_workflow(
        r#"
name: conditional
jobs:
  tests:
    strategy:
      matrix:
        os: [ubuntu-latest, macOS-latest, windows-latest]
    steps:
      - name: install downloader
        if: "matrix.os == 'macOS-latest'"
        run: "true"
      - name: run tests
        run: "true"
"#,
    )
    .await;

    assert_run_passed(&report);

    for cell in report.cells_for_job("tests") {
        assert_eq!(cell.status, CellStatus::Passed);
        let install = cell.step("install downloader").unwrap();
        let expected = if cell.cell.get("os") == Some("macOS-latest") {
            StepStatus::Succeeded
        } else {
            StepStatus::Skipped
        };
        assert_eq!(install.status, expected, "cell [{}]", cell.cell.label());
        assert_eq!(cell.step("run tests").unwrap().status, StepStatus::Succeeded);
    }
}

/// Negated conditions select the complement
#[tokio::test]
async fn test_not_equals_condition() {
    let (report, _) = run_workflow(
        r#"
name: negated
jobs:
  tests:
    strategy:
      matrix:
        os: [ubuntu-latest, windows-latest]
    steps:
      - name: unix only
        if: "matrix.os != 'windows-latest'"
        run: "true"
"#,
    )
    .await;

    let cells = report.cells_for_job("tests");
    assert_eq!(
        cells[0].step("unix only").unwrap().status,
        StepStatus::Succeeded
    );
    assert_eq!(
        cells[1].step("unix only").unwrap().status,
        StepStatus::Skipped
    );
}

/// A skipped `uses:` step never reaches the action runner
#[tokio::test]
async fn test_skipped_action_is_never_invoked() {
    let actions = MockActions::new();
    let report = run_workflow_with_actions(
        r#"
name: gated
jobs:
  tests:
    strategy:
      matrix:
        os: [ubuntu-latest, windows-latest]
    steps:
      - if: "matrix.os == 'windows-latest'"
        uses: windows/setup@v1
"#,
        actions.clone(),
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_passed(&report);
    let invocations = actions.invocations_of("windows/setup@v1");
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].cell, "os=windows-latest");
}
