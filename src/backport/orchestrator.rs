use std::sync::Arc;

use crate::backport::executor::{Applier, CherryPickExecutor};
use crate::backport::types::{
    ApplyResult, BackportReport, BackportTask, BranchOutcome, BranchTarget, CommitOutcome,
};
use crate::error::Result;
use crate::forge::types::{Commit, CreatePullRequest};
use crate::forge::Forge;
use crate::workspace::RepoManager;

/// Drives the commit × branch matrix: best effort across branches, strict
/// request order, one outcome per requested branch.
pub struct BackportOrchestrator {
    forge: Arc<dyn Forge>,
    repos: RepoManager,
    token: String,
}

impl BackportOrchestrator {
    pub fn new(forge: Arc<dyn Forge>, repos: RepoManager, token: &str) -> Self {
        Self {
            forge,
            repos,
            token: token.to_string(),
        }
    }

    pub async fn run(&self, task: &BackportTask) -> Result<BackportReport> {
        // One shared clone for all branches; a setup failure here aborts the
        // whole run since no branch can proceed without it.
        let repo = self.repos.ensure_repo_ready(&task.owner, &task.repo).await?;
        let executor = CherryPickExecutor::new(&repo, &task.username, &self.token);
        self.run_with_applier(task, &executor).await
    }

    pub(crate) async fn run_with_applier(
        &self,
        task: &BackportTask,
        applier: &dyn Applier,
    ) -> Result<BackportReport> {
        let mut outcomes = Vec::with_capacity(task.targets.len());
        for target in &task.targets {
            outcomes.push(self.process_branch(task, applier, target).await);
        }
        Ok(BackportReport { outcomes })
    }

    /// Per-branch error boundary: remote or git errors abandon this branch
    /// only and are recorded on its outcome.
    async fn process_branch(
        &self,
        task: &BackportTask,
        applier: &dyn Applier,
        target: &BranchTarget,
    ) -> BranchOutcome {
        match self.try_branch(task, applier, target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(branch = %target.name, error = %e, "Branch abandoned");
                let mut outcome = BranchOutcome::new(&target.name);
                outcome.error = Some(e.to_string());
                outcome
            }
        }
    }

    async fn try_branch(
        &self,
        task: &BackportTask,
        applier: &dyn Applier,
        target: &BranchTarget,
    ) -> Result<BranchOutcome> {
        let work_branch = work_branch_name(&target.name, &task.commits);
        let mut outcome = BranchOutcome::new(&target.name);

        tracing::info!(branch = %target.name, work_branch = %work_branch, "Backporting");

        match applier.begin_branch(&target.name, &work_branch).await? {
            ApplyResult::Applied => {}
            other => {
                outcome.error = Some(other.describe());
                return Ok(outcome);
            }
        }

        for commit in &task.commits {
            let result = applier.apply_commit(&work_branch, commit).await?;
            let applied = result.is_applied();
            outcome.commits.push(CommitOutcome {
                sha: commit.sha.clone(),
                result,
            });
            if !applied {
                // An unapplied commit makes later cherry-picks meaningless;
                // skip the rest of this branch and move on.
                tracing::warn!(
                    branch = %target.name,
                    sha = %commit.short_sha(),
                    "Commit did not apply, skipping remaining commits on this branch"
                );
                return Ok(outcome);
            }
        }

        applier.push(&work_branch).await?;

        let pr = self
            .forge
            .open_pull_request(
                &task.owner,
                &task.repo,
                &CreatePullRequest {
                    title: pr_title(target, &task.commits),
                    body: pr_body(target, &task.commits),
                    head_branch: work_branch.clone(),
                    base_branch: target.name.clone(),
                },
            )
            .await?;

        if !task.labels.is_empty() {
            if let Err(e) = self
                .forge
                .attach_labels(&task.owner, &task.repo, pr.number, &task.labels)
                .await
            {
                tracing::warn!(pr = pr.number, error = %e, "Failed to attach labels");
            }
        }

        tracing::info!(branch = %target.name, pr = pr.number, "Pull request opened");
        outcome.pull_request = Some(pr);
        Ok(outcome)
    }
}

/// `backport/{target}/{pr-N|commit-shortsha}[_...]`, derived from the commit
/// list so reruns of the same selection reuse the same branch name.
pub(crate) fn work_branch_name(target: &str, commits: &[Commit]) -> String {
    let refs: Vec<String> = commits
        .iter()
        .map(|c| match c.pull_request {
            Some(n) => format!("pr-{n}"),
            None => format!("commit-{}", c.short_sha()),
        })
        .collect();
    format!("backport/{target}/{}", refs.join("_"))
}

pub(crate) fn pr_title(target: &BranchTarget, commits: &[Commit]) -> String {
    let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    format!("[{}] {}", target.name, messages.join(" | "))
}

pub(crate) fn pr_body(target: &BranchTarget, commits: &[Commit]) -> String {
    let mut body = format!(
        "Backports the following commits to {}:\n",
        target.display_name()
    );
    for commit in commits {
        body.push_str(" - ");
        body.push_str(&commit.summary());
        if let Some(pr) = commit.pull_request {
            body.push_str(&format!(" (#{pr})"));
        }
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, BackportDefaults, ForgeConfig, WorkspaceConfig};
    use crate::error::AppError;
    use crate::forge::types::{CommitPage, PullRequestRef};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    fn commit(sha: &str, message: &str, pr: Option<u64>) -> Commit {
        Commit {
            sha: sha.to_string(),
            message: message.to_string(),
            author: Some("alice".to_string()),
            authored_at: None,
            pull_request: pr,
            is_merge: false,
        }
    }

    fn task(commits: Vec<Commit>, branches: &[&str], labels: &[&str]) -> BackportTask {
        BackportTask {
            owner: "elastic".to_string(),
            repo: "kibana".to_string(),
            commits,
            targets: branches.iter().map(|b| BranchTarget::new(*b)).collect(),
            username: "alice".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[derive(Default)]
    struct StubForge {
        fail_pr_on_base: Option<String>,
        opened: Mutex<Vec<CreatePullRequest>>,
        labeled: Mutex<Vec<(u64, Vec<String>)>>,
        fail_labels: bool,
    }

    #[async_trait]
    impl Forge for StubForge {
        async fn list_commits(
            &self,
            _owner: &str,
            _repo: &str,
            _author: Option<&str>,
            _page: u32,
        ) -> Result<CommitPage> {
            Ok(CommitPage {
                commits: vec![],
                next_page: None,
            })
        }

        async fn get_commit(&self, _owner: &str, _repo: &str, sha: &str) -> Result<Commit> {
            Ok(commit(sha, "stub", None))
        }

        async fn pull_request_for(
            &self,
            _owner: &str,
            _repo: &str,
            _sha: &str,
        ) -> Result<Option<u64>> {
            Ok(None)
        }

        async fn open_pull_request(
            &self,
            _owner: &str,
            _repo: &str,
            pr: &CreatePullRequest,
        ) -> Result<PullRequestRef> {
            if self.fail_pr_on_base.as_deref() == Some(pr.base_branch.as_str()) {
                return Err(AppError::Remote {
                    status: 422,
                    url: "https://api.github.com/repos/elastic/kibana/pulls".to_string(),
                    body: "A pull request already exists".to_string(),
                });
            }
            let mut opened = self.opened.lock().unwrap();
            opened.push(pr.clone());
            Ok(PullRequestRef {
                number: opened.len() as u64,
                url: format!("https://example.com/pr/{}", opened.len()),
            })
        }

        async fn attach_labels(
            &self,
            _owner: &str,
            _repo: &str,
            pr_number: u64,
            labels: &[String],
        ) -> Result<()> {
            if self.fail_labels {
                return Err(AppError::Remote {
                    status: 403,
                    url: "https://api.github.com/labels".to_string(),
                    body: "forbidden".to_string(),
                });
            }
            self.labeled
                .lock()
                .unwrap()
                .push((pr_number, labels.to_vec()));
            Ok(())
        }
    }

    /// Scripted applier: per (branch, sha) results, missing remote targets,
    /// recorded pushes.
    #[derive(Default)]
    struct ScriptedApplier {
        results: HashMap<(String, String), ApplyResult>,
        missing_targets: HashSet<String>,
        applied: Mutex<Vec<(String, String)>>,
        pushed: Mutex<Vec<String>>,
    }

    impl ScriptedApplier {
        fn with_result(mut self, target: &str, sha: &str, result: ApplyResult) -> Self {
            self.results
                .insert((target.to_string(), sha.to_string()), result);
            self
        }
    }

    #[async_trait]
    impl Applier for ScriptedApplier {
        async fn begin_branch(&self, target: &str, _work_branch: &str) -> Result<ApplyResult> {
            if self.missing_targets.contains(target) {
                return Ok(ApplyResult::Failed {
                    reason: format!("remote branch origin/{target} does not exist"),
                });
            }
            Ok(ApplyResult::Applied)
        }

        async fn apply_commit(&self, work_branch: &str, commit: &Commit) -> Result<ApplyResult> {
            // Work branches are "backport/{target}/...".
            let target = work_branch.split('/').nth(1).unwrap_or_default().to_string();
            self.applied
                .lock()
                .unwrap()
                .push((target.clone(), commit.sha.clone()));
            Ok(self
                .results
                .get(&(target, commit.sha.clone()))
                .cloned()
                .unwrap_or(ApplyResult::Applied))
        }

        async fn push(&self, work_branch: &str) -> Result<()> {
            self.pushed.lock().unwrap().push(work_branch.to_string());
            Ok(())
        }
    }

    fn orchestrator(forge: Arc<StubForge>) -> BackportOrchestrator {
        let config = AppConfig {
            forge: ForgeConfig {
                access_token: "token".to_string(),
                username: "alice".to_string(),
                api_base: "https://api.github.com".to_string(),
                clone_base: "https://github.com".to_string(),
                per_page: 20,
            },
            workspace: WorkspaceConfig {
                repos_dir: std::env::temp_dir(),
            },
            backport: BackportDefaults::default(),
        };
        BackportOrchestrator::new(forge, RepoManager::new(&config), "token")
    }

    #[tokio::test]
    async fn test_clean_matrix_opens_pr_per_branch() {
        let forge = Arc::new(StubForge::default());
        let orch = orchestrator(Arc::clone(&forge));
        let applier = ScriptedApplier::default();
        let task = task(
            vec![commit("abc1234def", "Fix parser", Some(42))],
            &["6.0", "6.1"],
            &["backport"],
        );

        let report = orch.run_with_applier(&task, &applier).await.unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.all_succeeded());
        assert!(report.outcomes.iter().all(|o| o.pull_request.is_some()));
        assert_eq!(
            applier.pushed.lock().unwrap().as_slice(),
            ["backport/6.0/pr-42", "backport/6.1/pr-42"]
        );
        assert_eq!(forge.labeled.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_report_has_one_outcome_per_branch_in_request_order() {
        let forge = Arc::new(StubForge::default());
        let orch = orchestrator(Arc::clone(&forge));
        let applier = ScriptedApplier::default()
            .with_result(
                "6.1",
                "abc",
                ApplyResult::Failed {
                    reason: "boom".to_string(),
                },
            )
            .with_result("7.0", "abc", ApplyResult::Conflict { files: vec![] });
        let task = task(
            vec![commit("abc", "Fix", None)],
            &["7.0", "6.1", "6.0"],
            &[],
        );

        let report = orch.run_with_applier(&task, &applier).await.unwrap();

        let branches: Vec<&str> = report
            .outcomes
            .iter()
            .map(|o| o.branch.as_str())
            .collect();
        assert_eq!(branches, ["7.0", "6.1", "6.0"]);
        assert!(!report.all_succeeded());
        assert!(report.outcomes[2].succeeded());
    }

    #[tokio::test]
    async fn test_failure_skips_remaining_commits_on_that_branch_only() {
        let forge = Arc::new(StubForge::default());
        let orch = orchestrator(Arc::clone(&forge));
        let applier = ScriptedApplier::default().with_result(
            "6.1",
            "abc",
            ApplyResult::Conflict {
                files: vec!["src/lib.rs".to_string()],
            },
        );
        let task = task(
            vec![commit("abc", "First", None), commit("def", "Second", None)],
            &["6.0", "6.1"],
            &[],
        );

        let report = orch.run_with_applier(&task, &applier).await.unwrap();

        // 6.0 applied both commits and got a PR.
        assert_eq!(report.outcomes[0].commits.len(), 2);
        assert!(report.outcomes[0].succeeded());

        // 6.1 stopped at the conflicting commit; "def" was never attempted.
        assert_eq!(report.outcomes[1].commits.len(), 1);
        assert_eq!(report.outcomes[1].failed_at(), Some("abc"));
        assert!(report.outcomes[1].pull_request.is_none());
        let attempts = applier.applied.lock().unwrap();
        assert!(!attempts.contains(&("6.1".to_string(), "def".to_string())));
    }

    #[tokio::test]
    async fn test_missing_remote_target_abandons_branch_and_continues() {
        let forge = Arc::new(StubForge::default());
        let orch = orchestrator(Arc::clone(&forge));
        let mut applier = ScriptedApplier::default();
        applier.missing_targets.insert("5.6".to_string());
        let task = task(vec![commit("abc", "Fix", None)], &["5.6", "6.0"], &[]);

        let report = orch.run_with_applier(&task, &applier).await.unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("origin/5.6"));
        assert!(report.outcomes[0].commits.is_empty());
        assert!(report.outcomes[1].succeeded());
    }

    #[tokio::test]
    async fn test_pr_creation_failure_is_caught_at_branch_boundary() {
        let forge = Arc::new(StubForge {
            fail_pr_on_base: Some("6.0".to_string()),
            ..StubForge::default()
        });
        let orch = orchestrator(Arc::clone(&forge));
        let applier = ScriptedApplier::default();
        let task = task(vec![commit("abc", "Fix", None)], &["6.0", "6.1"], &[]);

        let report = orch.run_with_applier(&task, &applier).await.unwrap();

        assert!(report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("pull request already exists"));
        assert!(report.outcomes[1].succeeded());
    }

    #[tokio::test]
    async fn test_label_failure_is_non_fatal() {
        let forge = Arc::new(StubForge {
            fail_labels: true,
            ..StubForge::default()
        });
        let orch = orchestrator(Arc::clone(&forge));
        let applier = ScriptedApplier::default();
        let task = task(vec![commit("abc", "Fix", None)], &["6.0"], &["backport"]);

        let report = orch.run_with_applier(&task, &applier).await.unwrap();
        assert!(report.all_succeeded());
    }

    /// The end-to-end shape from the tool's contract: clean on 6.0, conflict
    /// on 6.1.
    #[tokio::test]
    async fn test_mixed_two_branch_run() {
        let forge = Arc::new(StubForge::default());
        let orch = orchestrator(Arc::clone(&forge));
        let applier = ScriptedApplier::default().with_result(
            "6.1",
            "abc1234def5678",
            ApplyResult::Conflict {
                files: vec!["src/a.rs".to_string()],
            },
        );
        let task = task(
            vec![commit("abc1234def5678", "Fix parser", None)],
            &["6.0", "6.1"],
            &[],
        );

        let report = orch.run_with_applier(&task, &applier).await.unwrap();

        assert!(report.outcomes[0].succeeded());
        assert!(report.outcomes[0].pull_request.is_some());
        assert_eq!(report.outcomes[1].failed_at(), Some("abc1234def5678"));
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_work_branch_name_prefers_pr_numbers() {
        let commits = vec![
            commit("abc1234def", "Fix", Some(42)),
            commit("fedcba98765", "Other", None),
        ];
        assert_eq!(
            work_branch_name("6.0", &commits),
            "backport/6.0/pr-42_commit-fedcba9"
        );
    }

    #[test]
    fn test_pr_title_joins_messages() {
        let target = BranchTarget::new("6.0");
        let commits = vec![
            commit("abc", "Fix parser", None),
            commit("def", "Fix lexer", None),
        ];
        assert_eq!(pr_title(&target, &commits), "[6.0] Fix parser | Fix lexer");
    }

    #[test]
    fn test_pr_body_lists_commits_with_pr_references() {
        let target = BranchTarget {
            name: "6.0".to_string(),
            label: Some("6.0 maintenance".to_string()),
        };
        let commits = vec![commit("abc1234def", "Fix parser", Some(42))];
        let body = pr_body(&target, &commits);
        assert!(body.starts_with("Backports the following commits to 6.0 maintenance:"));
        assert!(body.contains("Fix parser"));
        assert!(body.contains("(#42)"));
    }
}
