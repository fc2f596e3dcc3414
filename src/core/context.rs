//! Cell context - variable bindings and step output flow for one job run

use crate::core::matrix::MatrixCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Execution context for one job run on one matrix cell.
///
/// Carries the immutable workflow environment, the cell's bound matrix
/// values, and the outputs recorded by earlier steps. Step outputs are an
/// explicit per-run data-flow channel; nothing here is ambient global
/// state, so two concurrently running cells never observe each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellContext {
    /// Workflow-level environment (threaded into every step process)
    pub env: HashMap<String, String>,

    /// The matrix cell this run is bound to
    pub cell: MatrixCell,

    /// Outputs recorded by earlier steps (step id -> key -> value)
    step_outputs: HashMap<String, HashMap<String, String>>,
}

fn interpolation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}")
            .unwrap_or_else(|_| unreachable!("interpolation regex is literal"))
    })
}

impl CellContext {
    /// Create a context for one cell
    pub fn new(env: HashMap<String, String>, cell: MatrixCell) -> Self {
        Self {
            env,
            cell,
            step_outputs: HashMap::new(),
        }
    }

    /// Record the named outputs of a finished step
    pub fn record_outputs(&mut self, step_id: &str, outputs: HashMap<String, String>) {
        if !outputs.is_empty() {
            self.step_outputs.insert(step_id.to_string(), outputs);
        }
    }

    /// Outputs recorded for a step, if any
    pub fn step_outputs(&self, step_id: &str) -> Option<&HashMap<String, String>> {
        self.step_outputs.get(step_id)
    }

    /// Flatten everything addressable from expressions into one map:
    /// `env.<key>`, `matrix.<dimension>`, `steps.<id>.outputs.<key>`.
    pub fn variables(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();

        for (key, value) in &self.env {
            vars.insert(format!("env.{}", key), value.clone());
        }

        for (dimension, value) in self.cell.bindings() {
            vars.insert(format!("matrix.{}", dimension), value.clone());
        }

        for (step_id, outputs) in &self.step_outputs {
            for (key, value) in outputs {
                vars.insert(
                    format!("steps.{}.outputs.{}", step_id, key),
                    value.clone(),
                );
            }
        }

        vars
    }

    /// Substitute `${{ ... }}` references in a template.
    ///
    /// Unresolved references render as the empty string, matching the
    /// platform behavior for missing outputs.
    pub fn interpolate(&self, template: &str) -> String {
        let vars = self.variables();
        interpolation_re()
            .replace_all(template, |caps: &regex::Captures| {
                vars.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}
