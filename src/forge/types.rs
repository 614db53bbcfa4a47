use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit as reported by the forge. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit hash.
    pub sha: String,
    /// First line of the commit message.
    pub message: String,
    /// Forge login of the author, when known.
    pub author: Option<String>,
    pub authored_at: Option<DateTime<Utc>>,
    /// Number of the pull request that introduced this commit, when known.
    pub pull_request: Option<u64>,
    pub is_merge: bool,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        let end = self.sha.len().min(7);
        &self.sha[..end]
    }

    /// Human-readable one-liner: "author@time - message - shortsha".
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if let Some(author) = &self.author {
            out.push_str(author);
            out.push('@');
        }
        if let Some(at) = &self.authored_at {
            out.push_str(&at.format("%Y-%m-%d %H:%M").to_string());
            out.push_str(" - ");
        }
        out.push_str(self.message.trim());
        out.push_str(" - ");
        out.push_str(self.short_sha());
        out
    }
}

/// One page of a commit listing.
///
/// Pagination is an explicit cursor: `next_page` is set when more pages
/// exist. No sentinel entries are ever mixed into `commits`.
#[derive(Debug, Clone)]
pub struct CommitPage {
    pub commits: Vec<Commit>,
    pub next_page: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub url: String,
}
