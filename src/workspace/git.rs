use std::path::Path;

use git2::{
    build::CheckoutBuilder, build::RepoBuilder, CherrypickOptions, Cred, FetchOptions, Oid,
    PushOptions, RemoteCallbacks, Repository, ResetType, Signature,
};

use crate::error::{AppError, Result};

/// Outcome of a single cherry-pick attempt.
#[derive(Debug, Clone)]
pub enum CherryPickOutcome {
    Applied { new_sha: String },
    Conflict { files: Vec<String> },
}

/// Validate a branch name before it reaches a refspec.
/// Names starting with `-` are rejected.
fn validate_branch_name(name: &str) -> Result<()> {
    if name.starts_with('-') {
        return Err(AppError::Git(format!(
            "Invalid branch name (starts with '-'): {name}"
        )));
    }
    Ok(())
}

/// Build `FetchOptions` that authenticate via credential callback.
/// The token is captured by the closure and never written to disk.
fn make_fetch_options<'a>(username: &'a str, token: &'a str) -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
        Cred::userpass_plaintext(username, token)
    });
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

/// Build `PushOptions` that authenticate via credential callback.
fn make_push_options<'a>(username: &'a str, token: &'a str) -> PushOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
        Cred::userpass_plaintext(username, token)
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

/// Clone a repository into the target directory.
///
/// The remote URL stored in `.git/config` will be the **plain** URL
/// (no credentials). Authentication is handled via credential callback only.
pub async fn clone(url: &str, target: &Path, username: &str, token: &str) -> Result<()> {
    if !url.starts_with("https://") {
        return Err(AppError::Git(format!(
            "Expected HTTPS clone URL, got: {url}"
        )));
    }

    let url = url.to_string();
    let target = target.to_path_buf();
    let username = username.to_string();
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let fetch_opts = make_fetch_options(&username, &token);
        RepoBuilder::new()
            .fetch_options(fetch_opts)
            .clone(&url, &target)?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Clone task panicked: {e}")))?
}

/// Update all remote-tracking branches from origin.
pub async fn fetch_origin(dir: &Path, username: &str, token: &str) -> Result<()> {
    let dir = dir.to_path_buf();
    let username = username.to_string();
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut remote = repo.find_remote("origin")?;
        let mut fetch_opts = make_fetch_options(&username, &token);
        remote.fetch(
            &["+refs/heads/*:refs/remotes/origin/*"],
            Some(&mut fetch_opts),
            None,
        )?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Fetch task panicked: {e}")))?
}

/// Force-create `work_branch` at `origin/{target}` and check it out.
///
/// Returns `false` without touching the working copy when the remote target
/// branch does not exist.
pub async fn begin_work_branch(dir: &Path, target: &str, work_branch: &str) -> Result<bool> {
    validate_branch_name(target)?;
    validate_branch_name(work_branch)?;

    let dir = dir.to_path_buf();
    let target = target.to_string();
    let work_branch = work_branch.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;

        let remote_ref = format!("refs/remotes/origin/{target}");
        let reference = match repo.find_reference(&remote_ref) {
            Ok(reference) => reference,
            Err(_) => return Ok(false),
        };
        let commit = reference.peel_to_commit()?;

        // Detach first so a leftover branch of the same name from a previous
        // run can be force-moved even if it is currently checked out.
        repo.set_head_detached(commit.id())?;
        repo.branch(&work_branch, &commit, true)?;

        let obj = repo.revparse_single(&format!("refs/heads/{work_branch}"))?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(&obj, Some(&mut checkout))?;
        repo.set_head(&format!("refs/heads/{work_branch}"))?;

        Ok(true)
    })
    .await
    .map_err(|e| AppError::Git(format!("Begin-branch task panicked: {e}")))?
}

/// Cherry-pick `sha` onto the current HEAD.
///
/// On conflict the working copy is restored to HEAD and the cherry-pick
/// state is cleaned up; the conflicted paths are reported to the caller.
pub async fn cherry_pick(
    dir: &Path,
    sha: &str,
    mainline: Option<u32>,
    committer_name: &str,
) -> Result<CherryPickOutcome> {
    let dir = dir.to_path_buf();
    let sha = sha.to_string();
    let committer_name = committer_name.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let oid = Oid::from_str(&sha)?;
        let commit = repo.find_commit(oid)?;

        let mut opts = CherrypickOptions::new();
        if let Some(parent) = mainline {
            opts.mainline(parent);
        }
        repo.cherrypick(&commit, Some(&mut opts))?;

        let mut index = repo.index()?;
        if index.has_conflicts() {
            let files = conflicted_paths(&index);
            let head = repo.head()?.peel_to_commit()?;
            repo.reset(head.as_object(), ResetType::Hard, None)?;
            repo.cleanup_state()?;
            return Ok(CherryPickOutcome::Conflict { files });
        }

        let tree_oid = index.write_tree()?;
        let tree = repo.find_tree(tree_oid)?;
        let head = repo.head()?.peel_to_commit()?;

        let message = format!(
            "{}\n\n(cherry picked from commit {})",
            commit.message().unwrap_or_default().trim_end(),
            sha
        );
        let committer = Signature::now(
            &committer_name,
            &format!("{committer_name}@users.noreply.github.com"),
        )?;
        let new_oid = repo.commit(
            Some("HEAD"),
            &commit.author(),
            &committer,
            &message,
            &tree,
            &[&head],
        )?;
        repo.cleanup_state()?;

        Ok(CherryPickOutcome::Applied {
            new_sha: new_oid.to_string(),
        })
    })
    .await
    .map_err(|e| AppError::Git(format!("Cherry-pick task panicked: {e}")))?
}

fn conflicted_paths(index: &git2::Index) -> Vec<String> {
    let mut files = Vec::new();
    if let Ok(conflicts) = index.conflicts() {
        for conflict in conflicts.flatten() {
            let path = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref())
                .map(|entry| entry.path.clone());
            if let Some(bytes) = path {
                files.push(String::from_utf8_lossy(&bytes).to_string());
            }
        }
    }
    files
}

/// Push a branch to origin.
pub async fn push(dir: &Path, branch_name: &str, username: &str, token: &str) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let branch_name = branch_name.to_string();
    let username = username.to_string();
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut remote = repo.find_remote("origin")?;
        let refspec = format!("refs/heads/{branch_name}:refs/heads/{branch_name}");
        let mut push_opts = make_push_options(&username, &token);
        remote.push(&[&refspec], Some(&mut push_opts))?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Push task panicked: {e}")))?
}
