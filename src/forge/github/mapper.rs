use chrono::{DateTime, Utc};

use crate::forge::types::{Commit, PullRequestRef};

/// Map a raw commit object from the GitHub API to our [`Commit`] type.
///
/// Errors carry a short description of the missing field; the caller wraps
/// them into a `Remote` error with the request URL attached.
pub fn map_commit(raw: &serde_json::Value) -> Result<Commit, String> {
    let sha = raw["sha"]
        .as_str()
        .ok_or_else(|| "commit object without sha".to_string())?
        .to_string();

    let message = raw["commit"]["message"]
        .as_str()
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    let author = raw["author"]["login"].as_str().map(|s| s.to_string());

    let authored_at = raw["commit"]["author"]["date"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let is_merge = raw["parents"]
        .as_array()
        .map(|parents| parents.len() > 1)
        .unwrap_or(false);

    Ok(Commit {
        sha,
        message,
        author,
        authored_at,
        // Filled in separately via the issue search endpoint.
        pull_request: None,
        is_merge,
    })
}

/// Extract the first issue number from an issue-search response.
pub fn first_issue_number(raw: &serde_json::Value) -> Option<u64> {
    raw["items"].as_array()?.first()?["number"].as_u64()
}

pub fn map_pull_request(pr: &octocrab::models::pulls::PullRequest) -> PullRequestRef {
    PullRequestRef {
        number: pr.number,
        url: pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default(),
    }
}
