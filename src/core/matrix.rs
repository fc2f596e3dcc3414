//! Matrix model and expansion

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// A declared execution matrix: dimension name -> ordered value list.
///
/// Dimensions keep the order they were declared in, which fixes the
/// expansion order of the realized cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    dimensions: Vec<(String, Vec<String>)>,
}

/// One concrete combination of matrix dimension values.
///
/// The tuple of (dimension, value) pairs uniquely identifies the cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    values: Vec<(String, String)>,
}

impl Matrix {
    /// Build a matrix from a YAML mapping, preserving declared order.
    ///
    /// Scalar values (numbers, booleans) are coerced to strings so that
    /// `3.10` and `"3.10"` name the same cell.
    pub fn from_mapping(mapping: &serde_yaml::Mapping) -> Result<Self> {
        let mut dimensions = Vec::new();

        for (key, value) in mapping {
            let name = match key.as_str() {
                Some(s) => s.to_string(),
                None => anyhow::bail!("Matrix dimension name must be a string"),
            };

            let values = match value {
                Value::Sequence(seq) => seq
                    .iter()
                    .map(|v| scalar_to_string(v))
                    .collect::<Result<Vec<_>>>()?,
                _ => anyhow::bail!(
                    "Matrix dimension '{}' must be a list of values",
                    name
                ),
            };

            if values.is_empty() {
                anyhow::bail!("Matrix dimension '{}' has no values", name);
            }

            dimensions.push((name, values));
        }

        if dimensions.is_empty() {
            anyhow::bail!("Matrix has no dimensions");
        }

        Ok(Matrix { dimensions })
    }

    /// Dimension names in declared order
    pub fn dimension_names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of cells the expansion produces (product of dimension sizes)
    pub fn cell_count(&self) -> usize {
        self.dimensions.iter().map(|(_, v)| v.len()).product()
    }

    /// Expand the matrix into the ordered list of cells.
    ///
    /// Pure function of the declaration: the first dimension varies
    /// slowest, the last varies fastest, values in declared order.
    pub fn expand(&self) -> Vec<MatrixCell> {
        let mut cells = vec![MatrixCell::default()];

        for (name, values) in &self.dimensions {
            let mut next = Vec::with_capacity(cells.len() * values.len());
            for cell in &cells {
                for value in values {
                    let mut expanded = cell.clone();
                    expanded
                        .values
                        .push((name.clone(), value.clone()));
                    next.push(expanded);
                }
            }
            cells = next;
        }

        cells
    }
}

impl MatrixCell {
    /// The empty cell, used for non-matrixed jobs
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bound (dimension, value) pairs in declared order
    pub fn bindings(&self) -> &[(String, String)] {
        &self.values
    }

    /// Look up the value bound to a dimension
    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == dimension)
            .map(|(_, value)| value.as_str())
    }

    /// Human-readable label, e.g. `os=ubuntu-latest, python-version=3.8`
    pub fn label(&self) -> String {
        if self.values.is_empty() {
            return "-".to_string();
        }
        self.values
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn scalar_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => anyhow::bail!("Matrix values must be scalars"),
    }
}
