use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub forge: ForgeConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub backport: BackportDefaults,
}

#[derive(Deserialize, Clone)]
pub struct ForgeConfig {
    pub access_token: String,
    pub username: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_clone_base")]
    pub clone_base: String,
    #[serde(default = "default_per_page")]
    pub per_page: u8,
}

// Manual Debug impl to avoid leaking the access token
impl std::fmt::Debug for ForgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeConfig")
            .field("access_token", &"[REDACTED]")
            .field("username", &self.username)
            .field("api_base", &self.api_base)
            .field("clone_base", &self.clone_base)
            .field("per_page", &self.per_page)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            repos_dir: default_repos_dir(),
        }
    }
}

/// Fallback branch and label selection when the CLI omits them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackportDefaults {
    #[serde(default)]
    pub branches: Vec<BranchChoice>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BranchChoice {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_clone_base() -> String {
    "https://github.com".to_string()
}

fn default_per_page() -> u8 {
    20
}

fn default_repos_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".backport").join("repositories"))
        .unwrap_or_else(|| PathBuf::from("/tmp/backport/repositories"))
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            // Try default paths
            builder = builder.add_source(config::File::with_name("backport").required(false));
        }

        // Environment variable overrides with BACKPORT_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("BACKPORT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Credentials must never be empty when a forge call is made.
    fn validate(&self) -> Result<()> {
        if self.forge.access_token.trim().is_empty() {
            return Err(AppError::Config(
                "forge.access_token must not be empty".to_string(),
            ));
        }
        if self.forge.username.trim().is_empty() {
            return Err(AppError::Config(
                "forge.username must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
