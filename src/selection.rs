//! The selection layer: turns CLI input into resolved commits and branches
//! for the orchestrator.

use crate::error::{AppError, Result};
use crate::forge::types::Commit;
use crate::forge::Forge;

/// Split an `owner/repo` upstream string.
pub fn parse_upstream(upstream: &str) -> Result<(String, String)> {
    match upstream.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(AppError::Config(format!(
            "Invalid upstream {upstream:?}, expected owner/repo"
        ))),
    }
}

/// Resolve explicit shas to full commit data, preserving the given order.
/// Abbreviated shas are expanded by the forge.
pub async fn resolve_commits(
    forge: &dyn Forge,
    owner: &str,
    repo: &str,
    shas: &[String],
) -> Result<Vec<Commit>> {
    let mut commits = Vec::with_capacity(shas.len());
    for sha in shas {
        commits.push(forge.get_commit(owner, repo, sha).await?);
    }
    Ok(commits)
}

/// Collect up to `pages` pages of commits starting at `first_page`,
/// following the explicit next-page cursor.
///
/// Returns the commits plus the cursor of the next unread page, if any.
pub async fn collect_commits(
    forge: &dyn Forge,
    owner: &str,
    repo: &str,
    author: Option<&str>,
    first_page: u32,
    pages: u32,
) -> Result<(Vec<Commit>, Option<u32>)> {
    let mut commits = Vec::new();
    let mut cursor = Some(first_page);
    let mut remaining = pages.max(1);

    while let Some(page) = cursor {
        if remaining == 0 {
            break;
        }
        remaining -= 1;

        let result = forge.list_commits(owner, repo, author, page).await?;
        commits.extend(result.commits);
        cursor = result.next_page;
    }

    Ok((commits, cursor))
}
