//! Trigger events and branch filters

use serde::{Deserialize, Serialize};

/// An event presented to the workflow at run time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    /// A push to a branch
    Push { branch: String },
    /// A pull request targeting a branch
    PullRequest { base: String },
}

/// Declared trigger filters (`on:` block).
///
/// A workflow with no `on:` block accepts every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    /// Branches accepted for push events; `None` means pushes don't trigger
    pub push_branches: Option<Vec<String>>,

    /// Target branches accepted for pull requests; `None` means PRs don't trigger
    pub pull_request_branches: Option<Vec<String>>,
}

impl Triggers {
    /// True when no filters were declared at all
    pub fn is_empty(&self) -> bool {
        self.push_branches.is_none() && self.pull_request_branches.is_none()
    }

    /// Check whether an event triggers the workflow.
    ///
    /// An empty branch list within a declared filter accepts any branch.
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        if self.is_empty() {
            return true;
        }

        match event {
            TriggerEvent::Push { branch } => match &self.push_branches {
                Some(branches) => branches.is_empty() || branches.iter().any(|b| b == branch),
                None => false,
            },
            TriggerEvent::PullRequest { base } => match &self.pull_request_branches {
                Some(branches) => branches.is_empty() || branches.iter().any(|b| b == base),
                None => false,
            },
        }
    }
}
