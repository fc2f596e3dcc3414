//! Test: step outputs - the explicit data-flow channel between steps

use crate::helpers::*;
use gantry::execution::SchedulingStrategy;

/// `::set-output` lines become addressable outputs for later steps
#[tokio::test]
async fn test_outputs_flow_to_later_steps() {
    let (report, _) = run_workflow(
        r#"
name: outputs
jobs:
  build:
    steps:
      - id: pip-cache
        name: locate pip cache
        run: echo "::set-output name=dir::/home/ci/.cache/pip"
      - name: report
        run: echo "cache at ${{ steps.pip-cache.outputs.dir }}"
"#,
    )
    .await;

    assert_run_passed(&report);
    let cell = single_cell(&report, "build");
    assert!(cell
        .step("report")
        .unwrap()
        .stdout
        .contains("cache at /home/ci/.cache/pip"));
}

/// Action-reported outputs go through the same channel
#[tokio::test]
async fn test_action_outputs_flow_to_with_params() {
    let actions = MockActions::new();
    actions.set_output("cache/lookup@v2", "cache-hit", "true");

    let report = run_workflow_with_actions(
        r#"
name: outputs
jobs:
  build:
    steps:
      - id: cache
        uses: cache/lookup@v2
      - uses: report/status@v1
        with:
          hit: ${{ steps.cache.outputs.cache-hit }}
"#,
        actions.clone(),
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_passed(&report);
    let reports = actions.invocations_of("report/status@v1");
    assert_eq!(reports[0].param("hit"), Some("true"));
}

/// Declared job outputs render from the final context
#[tokio::test]
async fn test_job_outputs_render_from_final_context() {
    let (report, _) = run_workflow(
        r#"
name: outputs
jobs:
  build:
    outputs:
      wheel-dir: ${{ steps.package.outputs.dir }}
    steps:
      - id: package
        run: echo "::set-output name=dir::dist/"
"#,
    )
    .await;

    let cell = single_cell(&report, "build");
    assert_eq!(cell.outputs.get("wheel-dir"), Some(&"dist/".to_string()));
}

/// References to outputs that never materialized render empty
#[tokio::test]
async fn test_missing_output_renders_empty() {
    let (report, _) = run_workflow(
        r#"
name: outputs
jobs:
  build:
    outputs:
      missing: ${{ steps.package.outputs.nothing }}
    steps:
      - id: package
        run: echo "::set-output name=dir::dist/"
"#,
    )
    .await;

    assert_run_passed(&report);
    let cell = single_cell(&report, "build");
    assert_eq!(cell.outputs.get("missing"), Some(&String::new()));
}

/// Outputs of a step without an id are not addressable
#[tokio::test]
async fn test_outputs_require_step_id() {
    let (report, _) = run_workflow(
        r#"
name: outputs
jobs:
  build:
    steps:
      - name: anonymous
        run: echo "::set-output name=x::1"
      - name: consumer
        run: echo "x=[${{ steps.anonymous.outputs.x }}]"
"#,
    )
    .await;

    assert_run_passed(&report);
    let cell = single_cell(&report, "build");
    assert!(cell.step("consumer").unwrap().stdout.contains("x=[]"));
}

/// Two cells never see each other's outputs
#[tokio::test]
async fn test_outputs_are_isolated_per_cell() {
    let (report, _) = run_workflow_with_strategy(
        r#"
name: isolation
jobs:
  tests:
    strategy:
      matrix:
        os: [a, b]
    steps:
      - id: ident
        run: echo "::set-output name=who::${{ matrix.os }}"
      - name: echo back
        run: echo "who=${{ steps.ident.outputs.who }}"
"#,
        SchedulingStrategy::Parallel,
    )
    .await;

    assert_run_passed(&report);
    let cells = report.cells_for_job("tests");
    assert!(cells[0].step("echo back").unwrap().stdout.contains("who=a"));
    assert!(cells[1].step("echo back").unwrap().stdout.contains("who=b"));
}
