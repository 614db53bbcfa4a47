use std::path::PathBuf;

use async_trait::async_trait;

use crate::backport::types::ApplyResult;
use crate::error::{AppError, Result};
use crate::forge::types::Commit;
use crate::workspace::git;
use crate::workspace::RepoHandle;

/// Applies commits to branches in the local working copy.
///
/// A trait so the orchestrator can be driven with a double in tests.
#[async_trait]
pub trait Applier: Send + Sync {
    /// Check out a fresh work branch based on `origin/{target}`.
    /// A missing remote target is reported as `Failed`, not as an error.
    async fn begin_branch(&self, target: &str, work_branch: &str) -> Result<ApplyResult>;

    /// Cherry-pick one commit onto the work branch.
    async fn apply_commit(&self, work_branch: &str, commit: &Commit) -> Result<ApplyResult>;

    /// Push the work branch to origin.
    async fn push(&self, work_branch: &str) -> Result<()>;
}

/// git2-backed [`Applier`] operating on one local clone.
pub struct CherryPickExecutor {
    repo_dir: PathBuf,
    username: String,
    token: String,
}

impl CherryPickExecutor {
    pub fn new(repo: &RepoHandle, username: &str, token: &str) -> Self {
        Self {
            repo_dir: repo.path.clone(),
            username: username.to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl Applier for CherryPickExecutor {
    async fn begin_branch(&self, target: &str, work_branch: &str) -> Result<ApplyResult> {
        if git::begin_work_branch(&self.repo_dir, target, work_branch).await? {
            Ok(ApplyResult::Applied)
        } else {
            Ok(ApplyResult::Failed {
                reason: format!("remote branch origin/{target} does not exist"),
            })
        }
    }

    async fn apply_commit(&self, work_branch: &str, commit: &Commit) -> Result<ApplyResult> {
        tracing::info!(
            branch = work_branch,
            sha = %commit.short_sha(),
            "Cherry-picking commit"
        );

        // Merge commits need an explicit mainline parent; 1 is the branch
        // the merge landed on.
        let mainline = commit.is_merge.then_some(1);

        match git::cherry_pick(&self.repo_dir, &commit.sha, mainline, &self.username).await {
            Ok(git::CherryPickOutcome::Applied { new_sha }) => {
                tracing::debug!(branch = work_branch, new_sha = %new_sha, "Applied cleanly");
                Ok(ApplyResult::Applied)
            }
            Ok(git::CherryPickOutcome::Conflict { files }) => {
                Ok(ApplyResult::Conflict { files })
            }
            // An outright git failure for this pair (bad sha, unreadable
            // object) is an expected per-pair outcome.
            Err(AppError::Git(reason)) => Ok(ApplyResult::Failed { reason }),
            Err(other) => Err(other),
        }
    }

    async fn push(&self, work_branch: &str) -> Result<()> {
        git::push(&self.repo_dir, work_branch, &self.username, &self.token).await
    }
}
