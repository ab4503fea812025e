use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::oauth::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};

/// OAuth client registration, as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .context("Failed to parse client secrets")?;

        file.installed
            .or(file.web)
            .context("Client secrets must contain an \"installed\" or \"web\" section")
    }
}

/// Load client secrets from file
pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials file {}", path.display()))?;

    ClientSecrets::from_json(&json)
        .with_context(|| format!("Invalid credentials file {}", path.display()))
}
