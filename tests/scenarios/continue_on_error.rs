//! Test: continue-on-error - per-cell absorption of failures

use crate::helpers::*;
use gantry::core::CellStatus;
use gantry::execution::SchedulingStrategy;

/// A failing cell flagged continue-on-error does not fail the run
#[tokio::test]
async fn test_flagged_cell_failure_is_absorbed() {
    let (report, _) = run_workflow(
        r#"
name: absorb
jobs:
  tests:
    continue-on-error: "matrix.os == 'windows-latest'"
    strategy:
      matrix:
        os: [ubuntu-latest, windows-latest]
    steps:
      - if: "matrix.os == 'windows-latest'"
        run: exit 1
      - run: "true"
"#,
    )
    .await;

    assert_run_passed(&report);
    assert_eq!(report.state.passed_cells, 1);
    assert_eq!(report.state.absorbed_cells, 1);
    assert_eq!(report.state.failed_cells, 0);

    let cells = report.cells_for_job("tests");
    assert_eq!(cells[0].status, CellStatus::Passed);
    assert_eq!(cells[1].status, CellStatus::Failed);
    assert!(!cells[1].fatal());
}

/// The predicate binds per cell: the same job fails fatally on cells
/// where it evaluates false
#[tokio::test]
async fn test_unflagged_cell_failure_is_fatal() {
    let (report, _) = run_workflow(
        r#"
name: fatal
jobs:
  tests:
    continue-on-error: "matrix.os == 'windows-latest'"
    strategy:
      matrix:
        os: [ubuntu-latest, windows-latest]
    steps:
      - run: exit 1
"#,
    )
    .await;

    assert_run_failed(&report);
    assert_eq!(report.state.failed_cells, 1);
    assert_eq!(report.state.absorbed_cells, 1);

    let cells = report.cells_for_job("tests");
    assert!(cells[0].fatal());
    assert!(!cells[1].fatal());
}

/// A literal boolean flag absorbs every cell of the job
#[tokio::test]
async fn test_boolean_flag_absorbs_all_cells() {
    let (report, _) = run_workflow(
        r#"
name: lenient
jobs:
  experimental:
    continue-on-error: true
    steps:
      - run: exit 1
  stable:
    steps:
      - run: "true"
"#,
    )
    .await;

    assert_run_passed(&report);
    assert_eq!(report.state.absorbed_cells, 1);
    assert_eq!(report.state.passed_cells, 1);
}

/// Absorption does not alter the cell result itself, only the aggregate
#[tokio::test]
async fn test_absorbed_cell_still_reports_failure() {
    let actions = MockActions::new();
    actions.fail_action("broken/action@v1");

    let report = run_workflow_with_actions(
        r#"
name: reportcard
jobs:
  tests:
    continue-on-error: true
    steps:
      - uses: broken/action@v1
"#,
        actions,
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_passed(&report);
    let cell = single_cell(&report, "tests");
    assert_eq!(cell.status, CellStatus::Failed);
    assert!(cell.continue_on_error);
    assert!(cell.steps[0].error.is_some());
}
