use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::workspace::git;

/// Keeps local clones of upstream repositories up to date.
pub struct RepoManager {
    repos_dir: PathBuf,
    clone_base: String,
    username: String,
    token: String,
}

/// A local clone ready for cherry-picking.
#[derive(Debug, Clone)]
pub struct RepoHandle {
    pub path: PathBuf,
}

impl RepoManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            repos_dir: config.workspace.repos_dir.clone(),
            clone_base: config.forge.clone_base.trim_end_matches('/').to_string(),
            username: config.forge.username.clone(),
            token: config.forge.access_token.clone(),
        }
    }

    /// Clone the upstream repository on first use, fetch updates otherwise.
    ///
    /// Idempotent: a second call with no intervening remote changes is a
    /// no-op fetch.
    pub async fn ensure_repo_ready(&self, owner: &str, repo: &str) -> Result<RepoHandle> {
        let path = self.repo_path(owner, repo);

        if path.join(".git").exists() {
            tracing::info!(repo = %format!("{owner}/{repo}"), path = %path.display(), "Fetching updates");
            git::fetch_origin(&path, &self.username, &self.token)
                .await
                .map_err(|e| AppError::RepoSetup(format!("fetch of {owner}/{repo} failed: {e}")))?;
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::RepoSetup(format!("cannot create repos dir: {e}")))?;
            }
            let url = format!("{}/{owner}/{repo}.git", self.clone_base);
            tracing::info!(url = %url, path = %path.display(), "Cloning upstream repository");
            git::clone(&url, &path, &self.username, &self.token)
                .await
                .map_err(|e| AppError::RepoSetup(format!("clone of {owner}/{repo} failed: {e}")))?;
        }

        Ok(RepoHandle { path })
    }

    fn repo_path(&self, owner: &str, repo: &str) -> PathBuf {
        self.repos_dir.join(format!("{owner}__{repo}"))
    }
}
