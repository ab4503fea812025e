use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::oauth::GOOGLE_TOKEN_URL;

/// Seconds before the real expiry at which a token is already treated as expired
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Persisted OAuth credential, stored in Google's "authorized user" layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(rename = "token", default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// Where a persisted token stands, as reported by `auth status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    Valid,
    Refreshable,
    Expired,
}

impl StoredToken {
    /// Check if token is expired or close to expiring (within 5 minutes)
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() >= expiry - Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }

    /// Usable as-is: an access token that has not expired
    pub fn is_valid(&self) -> bool {
        self.access_token.is_some() && !self.is_expired()
    }

    /// Expired, but can be renewed without user interaction
    pub fn is_refreshable(&self) -> bool {
        self.is_expired() && self.refresh_token.is_some()
    }

    pub fn state(&self) -> TokenState {
        if self.is_valid() {
            TokenState::Valid
        } else if self.is_refreshable() {
            TokenState::Refreshable
        } else {
            TokenState::Expired
        }
    }
}

/// Save token to file, creating missing parent directories
pub fn save_token(token_path: &Path, token: &StoredToken) -> Result<()> {
    if let Some(parent) = token_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token directory {}", parent.display())
            })?;
        }
    }

    let json = serde_json::to_string_pretty(token)
        .context("Failed to serialize token")?;

    fs::write(token_path, json)
        .with_context(|| format!("Failed to write token file {}", token_path.display()))?;

    info!("Token saved to {}", token_path.display());
    Ok(())
}

/// Load token from file
pub fn load_token(token_path: &Path) -> Result<StoredToken> {
    let json = fs::read_to_string(token_path)
        .with_context(|| format!("Failed to read token file {}", token_path.display()))?;

    let token: StoredToken = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse token file {}", token_path.display()))?;

    Ok(token)
}

/// Remove the persisted token. Returns whether a token was present.
pub fn clear_token(token_path: &Path) -> Result<bool> {
    if !token_path.exists() {
        return Ok(false);
    }

    fs::remove_file(token_path)
        .with_context(|| format!("Failed to remove token file {}", token_path.display()))?;
    info!("Token removed from {}", token_path.display());
    Ok(true)
}

/// Inspect the persisted token without refreshing it
pub fn token_status(token_path: &Path) -> Result<TokenState> {
    if !token_path.exists() {
        return Ok(TokenState::Missing);
    }
    Ok(load_token(token_path)?.state())
}

#[cfg(test)]
pub(crate) fn sample_token(expires_in_secs: Option<i64>, refresh: Option<&str>) -> StoredToken {
    StoredToken {
        access_token: Some("ya29.access".to_string()),
        refresh_token: refresh.map(str::to_string),
        token_uri: GOOGLE_TOKEN_URL.to_string(),
        client_id: "client-id.apps.googleusercontent.com".to_string(),
        client_secret: "client-secret".to_string(),
        scopes: vec![super::GMAIL_COMPOSE_SCOPE.to_string()],
        expiry: expires_in_secs.map(|s| Utc::now() + Duration::seconds(s)),
    }
}
