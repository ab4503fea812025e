use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::DraftError;
use crate::gmail::client::GMAIL_API_BASE;

#[derive(Debug, Clone)]
pub struct Config {
    // OAuth files
    pub token_path: PathBuf,
    pub credentials_path: PathBuf,

    // Sender address (only required for drafting)
    pub user_email: Option<String>,

    // Gmail REST endpoint
    pub api_base: String,

    // Logging
    pub debug_logs_enabled: bool,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file from multiple possible locations
        // Priority: 1. Current directory, 2. docker/.env, 3. Parent directory
        if dotenvy::dotenv().is_err() {
            if dotenvy::from_path("docker/.env").is_err() {
                dotenvy::from_path("../.env").ok();
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Required values are checked before any path is resolved, so a missing
    /// variable never leads to file system access.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token_path = non_empty("GOOGLE_TOKEN_PATH")
            .ok_or(DraftError::MissingEnv("GOOGLE_TOKEN_PATH"))?;
        let credentials_path = non_empty("GOOGLE_CREDENTIALS_PATH")
            .ok_or(DraftError::MissingEnv("GOOGLE_CREDENTIALS_PATH"))?;

        let config = Config {
            token_path: expand_home(&token_path),
            credentials_path: expand_home(&credentials_path),
            user_email: non_empty("USER_EMAIL").map(|s| s.trim().to_string()),
            api_base: non_empty("GMAIL_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| GMAIL_API_BASE.to_string()),
            debug_logs_enabled: lookup("DEBUG_LOGS_ENABLED")
                .unwrap_or_else(|| "false".to_string())
                .to_lowercase() == "true",
            log_file: non_empty("LOG_FILE").map(|s| expand_home(&s)),
        };

        Ok(config)
    }

    /// Sender address, required once a message is actually composed
    pub fn sender(&self) -> Result<&str> {
        Ok(self
            .user_email
            .as_deref()
            .ok_or(DraftError::MissingEnv("USER_EMAIL"))?)
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Path::new(raw).to_path_buf(),
    }
}
