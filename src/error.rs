use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote API error ({status}) at {url}: {body}")]
    Remote {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Commit not found on remote: {sha}")]
    CommitNotFound { sha: String },

    #[error("Repository setup failed: {0}")]
    RepoSetup(String),

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<git2::Error> for AppError {
    fn from(e: git2::Error) -> Self {
        AppError::Git(e.message().to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
