pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::{Commit, CommitPage, CreatePullRequest, PullRequestRef};

/// Remote operations against the code-hosting service.
///
/// Credentials are injected at construction time and scoped to one run;
/// a single run targets exactly one identity and one remote.
#[async_trait]
pub trait Forge: Send + Sync {
    /// List one page of commits, optionally filtered to a single author.
    /// An empty page is a valid result, not an error.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        author: Option<&str>,
        page: u32,
    ) -> Result<CommitPage>;

    /// Resolve a (possibly abbreviated) sha to full commit data.
    async fn get_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<Commit>;

    /// Look up the pull request that introduced `sha` on the main line.
    async fn pull_request_for(&self, owner: &str, repo: &str, sha: &str) -> Result<Option<u64>>;

    /// Open a pull request.
    async fn open_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &CreatePullRequest,
    ) -> Result<PullRequestRef>;

    /// Add labels to a pull request. Side effect only.
    async fn attach_labels(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<()>;
}
