//! Predicate language for `if:` and `continue-on-error:` expressions

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Error raised when a predicate expression cannot be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredicateError {
    #[error("unsupported predicate expression: '{0}'")]
    Unsupported(String),
}

/// A predicate over the bound cell values and environment.
///
/// Compiled once at load time and evaluated against the flat variable
/// map of a cell context (e.g. `matrix.os`, `env.CI`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Constant `true` / `false`
    Literal(bool),
    /// `<key> == '<value>'`
    Equals { key: String, value: String },
    /// `<key> != '<value>'`
    NotEquals { key: String, value: String },
}

fn comparison_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // key, operator, single-quoted value
        Regex::new(r"^\s*([A-Za-z0-9_.\-]+)\s*(==|!=)\s*'([^']*)'\s*$")
            .unwrap_or_else(|_| unreachable!("predicate regex is literal"))
    })
}

impl Predicate {
    /// Parse a predicate expression
    pub fn parse(expr: &str) -> Result<Self, PredicateError> {
        match expr.trim() {
            "true" => return Ok(Predicate::Literal(true)),
            "false" => return Ok(Predicate::Literal(false)),
            _ => {}
        }

        let captures = comparison_re()
            .captures(expr)
            .ok_or_else(|| PredicateError::Unsupported(expr.to_string()))?;

        let key = captures[1].to_string();
        let value = captures[3].to_string();

        match &captures[2] {
            "==" => Ok(Predicate::Equals { key, value }),
            "!=" => Ok(Predicate::NotEquals { key, value }),
            _ => Err(PredicateError::Unsupported(expr.to_string())),
        }
    }

    /// Evaluate against a flat variable map.
    ///
    /// Unbound keys compare as the empty string, so `matrix.os != 'x'`
    /// holds on a non-matrixed cell.
    pub fn evaluate(&self, variables: &HashMap<String, String>) -> bool {
        match self {
            Predicate::Literal(value) => *value,
            Predicate::Equals { key, value } => {
                variables.get(key).map(String::as_str).unwrap_or("") == value
            }
            Predicate::NotEquals { key, value } => {
                variables.get(key).map(String::as_str).unwrap_or("") != value
            }
        }
    }
}
