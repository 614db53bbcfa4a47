use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backport::backport::{BackportOrchestrator, BackportTask, BranchTarget};
use backport::config::AppConfig;
use backport::forge::github::GitHubForge;
use backport::selection;
use backport::workspace::RepoManager;

#[derive(Parser)]
#[command(
    name = "backport",
    about = "Cherry-pick merged commits onto release branches and open backport pull requests"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Backport commits onto release branches, one pull request per branch
    Run {
        /// Upstream repository as owner/repo
        upstream: String,

        /// Commit sha to backport; repeat for multiple, oldest first
        #[arg(long = "sha", required = true)]
        shas: Vec<String>,

        /// Target release branch; repeat for multiple
        #[arg(long = "branch")]
        branches: Vec<String>,

        /// Label to attach to each opened pull request
        #[arg(long = "label")]
        labels: Vec<String>,
    },
    /// List commits on the upstream default branch
    Commits {
        /// Upstream repository as owner/repo
        upstream: String,

        /// Filter to this author instead of the configured username
        #[arg(long)]
        author: Option<String>,

        /// List commits from all authors
        #[arg(long)]
        all: bool,

        /// Page to start at
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let forge = Arc::new(GitHubForge::new(&config.forge)?);

    match cli.command {
        Command::Run {
            upstream,
            shas,
            branches,
            labels,
        } => {
            let (owner, repo) = selection::parse_upstream(&upstream)?;
            let commits = selection::resolve_commits(forge.as_ref(), &owner, &repo, &shas).await?;

            let targets: Vec<BranchTarget> = if branches.is_empty() {
                config
                    .backport
                    .branches
                    .iter()
                    .map(|b| BranchTarget {
                        name: b.name.clone(),
                        label: b.label.clone(),
                    })
                    .collect()
            } else {
                branches.into_iter().map(BranchTarget::new).collect()
            };
            if targets.is_empty() {
                anyhow::bail!("No target branches: pass --branch or configure [backport] branches");
            }

            let labels = if labels.is_empty() {
                config.backport.labels.clone()
            } else {
                labels
            };

            let task = BackportTask {
                owner,
                repo,
                commits,
                targets,
                username: config.forge.username.clone(),
                labels,
            };

            let orchestrator = BackportOrchestrator::new(
                forge,
                RepoManager::new(&config),
                &config.forge.access_token,
            );
            let report = orchestrator.run(&task).await?;

            print!("{}", report.render());
            if !report.all_succeeded() {
                std::process::exit(1);
            }
        }
        Command::Commits {
            upstream,
            author,
            all,
            page,
            pages,
        } => {
            let (owner, repo) = selection::parse_upstream(&upstream)?;
            let author = if all {
                None
            } else {
                Some(author.unwrap_or_else(|| config.forge.username.clone()))
            };

            let (commits, next) = selection::collect_commits(
                forge.as_ref(),
                &owner,
                &repo,
                author.as_deref(),
                page,
                pages,
            )
            .await?;

            for commit in &commits {
                println!("{}", commit.summary());
            }
            if commits.is_empty() {
                println!("No commits found");
            }
            if let Some(next) = next {
                println!("(more commits available, rerun with --page {next})");
            }
        }
    }

    Ok(())
}
