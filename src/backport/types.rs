use serde::Serialize;

use crate::forge::types::{Commit, PullRequestRef};

/// A release branch to backport onto.
#[derive(Debug, Clone)]
pub struct BranchTarget {
    pub name: String,
    /// Optional display label, e.g. "6.0 maintenance".
    pub label: Option<String>,
}

impl BranchTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Everything one invocation needs. Read-only for the remainder of the run.
#[derive(Debug, Clone)]
pub struct BackportTask {
    pub owner: String,
    pub repo: String,
    pub commits: Vec<Commit>,
    pub targets: Vec<BranchTarget>,
    pub username: String,
    pub labels: Vec<String>,
}

/// Result of applying one commit onto one branch.
///
/// Conflicts and failures are ordinary values, not errors: they are expected
/// outcomes that must not stop other branches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ApplyResult {
    Applied,
    Conflict { files: Vec<String> },
    Failed { reason: String },
}

impl ApplyResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyResult::Applied)
    }

    pub fn describe(&self) -> String {
        match self {
            ApplyResult::Applied => "applied".to_string(),
            ApplyResult::Conflict { files } => {
                format!("conflict ({})", files.join(", "))
            }
            ApplyResult::Failed { reason } => format!("failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub sha: String,
    pub result: ApplyResult,
}

/// Per-branch result, finalized when the branch loop ends.
#[derive(Debug, Clone, Serialize)]
pub struct BranchOutcome {
    pub branch: String,
    pub commits: Vec<CommitOutcome>,
    pub pull_request: Option<PullRequestRef>,
    /// Terminal error if the branch was abandoned.
    pub error: Option<String>,
}

impl BranchOutcome {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            commits: Vec::new(),
            pull_request: None,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
            && self.pull_request.is_some()
            && self.commits.iter().all(|c| c.result.is_applied())
    }

    /// The sha the branch failed at, when it did.
    pub fn failed_at(&self) -> Option<&str> {
        self.commits
            .iter()
            .find(|c| !c.result.is_applied())
            .map(|c| c.sha.as_str())
    }
}

/// Aggregate of all branch outcomes; the only object returned to the caller.
/// Contains exactly one outcome per requested branch, in request order.
#[derive(Debug, Clone, Serialize)]
pub struct BackportReport {
    pub outcomes: Vec<BranchOutcome>,
}

impl BackportReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(BranchOutcome::succeeded)
    }

    /// Human-readable per-branch summary for the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            if let Some(pr) = &outcome.pull_request {
                out.push_str(&format!(
                    "{}: pull request #{} opened ({})\n",
                    outcome.branch, pr.number, pr.url
                ));
            } else if let Some(failed) = outcome.commits.iter().find(|c| !c.result.is_applied()) {
                out.push_str(&format!(
                    "{}: failed, {} at {}\n",
                    outcome.branch,
                    failed.result.describe(),
                    &failed.sha[..failed.sha.len().min(7)]
                ));
            } else {
                out.push_str(&format!(
                    "{}: failed, {}\n",
                    outcome.branch,
                    outcome.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        out
    }
}
