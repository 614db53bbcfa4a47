use async_trait::async_trait;
use octocrab::Octocrab;

use crate::config::ForgeConfig;
use crate::error::{AppError, Result};
use crate::forge::types::{Commit, CommitPage, CreatePullRequest, PullRequestRef};
use crate::forge::Forge;

use super::mapper;

/// GitHub implementation of [`Forge`] on top of octocrab.
///
/// The access token is baked into the client at construction; there is no
/// process-wide credential state.
pub struct GitHubForge {
    client: Octocrab,
    api_base: String,
    per_page: u8,
}

impl GitHubForge {
    pub fn new(config: &ForgeConfig) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(config.access_token.clone())
            .base_uri(config.api_base.clone())
            .map_err(|e| AppError::Config(format!("Invalid forge api_base: {e}")))?
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build forge client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            per_page: config.per_page,
        })
    }

    /// Convert an octocrab error into a [`AppError::Remote`] carrying the
    /// request URL and upstream body for diagnostics.
    fn remote_err(&self, route: &str, e: octocrab::Error) -> AppError {
        let url = format!("{}{}", self.api_base, route);
        match e {
            octocrab::Error::GitHub { source, .. } => AppError::Remote {
                status: source.status_code.as_u16(),
                url,
                body: source.message.clone(),
            },
            other => AppError::Remote {
                status: 0,
                url,
                body: other.to_string(),
            },
        }
    }

    fn malformed(&self, route: &str, detail: String) -> AppError {
        AppError::Remote {
            status: 200,
            url: format!("{}{}", self.api_base, route),
            body: format!("malformed response: {detail}"),
        }
    }
}

fn commits_route(owner: &str, repo: &str, author: Option<&str>, per_page: u8, page: u32) -> String {
    let mut route = format!("/repos/{owner}/{repo}/commits?per_page={per_page}&page={page}");
    if let Some(author) = author {
        route.push_str("&author=");
        route.push_str(&urlencoding::encode(author));
    }
    route
}

/// A full page means more results may exist; an underfull page is the last.
fn next_page(returned: usize, per_page: u8, page: u32) -> Option<u32> {
    if returned == per_page as usize {
        Some(page + 1)
    } else {
        None
    }
}

#[async_trait]
impl Forge for GitHubForge {
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        author: Option<&str>,
        page: u32,
    ) -> Result<CommitPage> {
        let route = commits_route(owner, repo, author, self.per_page, page);
        let raw: Vec<serde_json::Value> = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(|e| self.remote_err(&route, e))?;

        let commits = raw
            .iter()
            .map(mapper::map_commit)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|detail| self.malformed(&route, detail))?;

        let next_page = next_page(commits.len(), self.per_page, page);
        Ok(CommitPage { commits, next_page })
    }

    async fn get_commit(&self, owner: &str, repo: &str, sha: &str) -> Result<Commit> {
        let route = format!("/repos/{owner}/{repo}/commits/{sha}");
        let raw: serde_json::Value = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(|e| match self.remote_err(&route, e) {
                AppError::Remote { status: 404, .. } => AppError::CommitNotFound {
                    sha: sha.to_string(),
                },
                other => other,
            })?;

        let mut commit =
            mapper::map_commit(&raw).map_err(|detail| self.malformed(&route, detail))?;

        // Best effort: a missing PR link never fails commit resolution.
        match self.pull_request_for(owner, repo, &commit.sha).await {
            Ok(pr) => commit.pull_request = pr,
            Err(e) => {
                tracing::warn!(sha = %commit.sha, error = %e, "Pull request lookup failed")
            }
        }

        Ok(commit)
    }

    async fn pull_request_for(&self, owner: &str, repo: &str, sha: &str) -> Result<Option<u64>> {
        let query = format!("repo:{owner}/{repo} {sha} type:pr is:merged");
        let route = format!("/search/issues?q={}", urlencoding::encode(&query));
        let raw: serde_json::Value = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(|e| self.remote_err(&route, e))?;

        Ok(mapper::first_issue_number(&raw))
    }

    async fn open_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &CreatePullRequest,
    ) -> Result<PullRequestRef> {
        let created = self
            .client
            .pulls(owner, repo)
            .create(&pr.title, &pr.head_branch, &pr.base_branch)
            .body(&pr.body)
            .send()
            .await
            .map_err(|e| self.remote_err(&format!("/repos/{owner}/{repo}/pulls"), e))?;

        Ok(mapper::map_pull_request(&created))
    }

    async fn attach_labels(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        labels: &[String],
    ) -> Result<()> {
        self.client
            .issues(owner, repo)
            .add_labels(pr_number, labels)
            .await
            .map_err(|e| {
                self.remote_err(&format!("/repos/{owner}/{repo}/issues/{pr_number}/labels"), e)
            })?;

        Ok(())
    }
}
