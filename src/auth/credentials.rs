use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};

use super::secrets::{ClientSecrets, load_client_secrets};
use super::token::{StoredToken, load_token, save_token};
use crate::config::env::Config;
use crate::error::DraftError;

/// The two ways of obtaining a fresh token. `GoogleAuthorizer` is the real
/// one; tests swap in fakes.
#[async_trait]
pub trait Authorizer {
    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken>;
    async fn authorize(&self, secrets: &ClientSecrets) -> Result<StoredToken>;
}

/// Get a valid credential: cached, refreshed, or newly authorized
pub async fn get_credentials<A>(config: &Config, authorizer: &A) -> Result<StoredToken>
where
    A: Authorizer + Sync,
{
    let token_path = &config.token_path;

    // Try to load existing token
    let cached = if token_path.exists() {
        println!("📧 Loading cached Gmail token...");
        Some(load_token(token_path)?)
    } else {
        debug!("No token file at {}", token_path.display());
        None
    };

    if let Some(token) = &cached {
        if token.is_valid() {
            println!("✓ Using cached Gmail token");
            return Ok(token.clone());
        }
    }

    let token = match cached {
        Some(token) if token.is_refreshable() => {
            println!("🔄 Gmail token expired, refreshing...");
            authorizer.refresh(&token).await?
        }
        _ => {
            if !config.credentials_path.exists() {
                return Err(DraftError::CredentialsNotFound(config.credentials_path.clone()).into());
            }

            println!("📧 Gmail authorization required...");
            let secrets = load_client_secrets(&config.credentials_path)?;
            let token = authorizer.authorize(&secrets).await?;
            println!("✓ Gmail authorized successfully!\n");
            token
        }
    };

    // Save the credentials for the next run
    save_token(token_path, &token)?;
    info!("Credential ready");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::sample_token;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{TempDir, tempdir};

    #[derive(Default)]
    struct FakeAuthorizer {
        refreshes: AtomicUsize,
        authorizations: AtomicUsize,
    }

    #[async_trait]
    impl Authorizer for FakeAuthorizer {
        async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let mut renewed = sample_token(Some(3600), token.refresh_token.as_deref());
            renewed.access_token = Some("refreshed".to_string());
            Ok(renewed)
        }

        async fn authorize(&self, secrets: &ClientSecrets) -> Result<StoredToken> {
            self.authorizations.fetch_add(1, Ordering::SeqCst);
            let mut token = sample_token(Some(3600), Some("new-refresh"));
            token.access_token = Some("authorized".to_string());
            token.client_id = secrets.client_id.clone();
            Ok(token)
        }
    }

    struct FailingRefresh;

    #[async_trait]
    impl Authorizer for FailingRefresh {
        async fn refresh(&self, _token: &StoredToken) -> Result<StoredToken> {
            anyhow::bail!("invalid_grant")
        }

        async fn authorize(&self, _secrets: &ClientSecrets) -> Result<StoredToken> {
            panic!("interactive flow must not run after a failed refresh");
        }
    }

    fn config_in(dir: &TempDir) -> Config {
        let root = dir.path();
        Config::from_lookup(|key| match key {
            "GOOGLE_TOKEN_PATH" => Some(root.join("state/token.json").display().to_string()),
            "GOOGLE_CREDENTIALS_PATH" => Some(root.join("credentials.json").display().to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn write_secrets(path: &Path) {
        fs::write(
            path,
            r#"{"installed":{"client_id":"from-file","client_secret":"s"}}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_valid_token_is_returned_untouched() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let token = sample_token(Some(3600), Some("refresh"));
        save_token(&config.token_path, &token).unwrap();
        let authorizer = FakeAuthorizer::default();

        let result = tokio_test::block_on(get_credentials(&config, &authorizer)).unwrap();

        assert_eq!(result, token);
        assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(authorizer.authorizations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_saved() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        save_token(&config.token_path, &sample_token(Some(-60), Some("refresh"))).unwrap();
        let authorizer = FakeAuthorizer::default();

        let result = get_credentials(&config, &authorizer).await.unwrap();

        assert_eq!(result.access_token.as_deref(), Some("refreshed"));
        assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(authorizer.authorizations.load(Ordering::SeqCst), 0);

        let saved = load_token(&config.token_path).unwrap();
        assert_eq!(saved.access_token.as_deref(), Some("refreshed"));
    }

    #[tokio::test]
    async fn test_missing_credentials_file() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let authorizer = FakeAuthorizer::default();

        let err = get_credentials(&config, &authorizer).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DraftError>(),
            Some(DraftError::CredentialsNotFound(path)) if *path == config.credentials_path
        ));
        assert!(!config.token_path.exists());
        assert_eq!(authorizer.authorizations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_run_authorizes_and_creates_token_dir() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        write_secrets(&config.credentials_path);
        let authorizer = FakeAuthorizer::default();

        let result = get_credentials(&config, &authorizer).await.unwrap();

        assert_eq!(result.access_token.as_deref(), Some("authorized"));
        assert_eq!(result.client_id, "from-file");
        assert_eq!(authorizer.authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(load_token(&config.token_path).unwrap(), result);
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_reauthorizes() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        save_token(&config.token_path, &sample_token(Some(-60), None)).unwrap();
        write_secrets(&config.credentials_path);
        let authorizer = FakeAuthorizer::default();

        let result = get_credentials(&config, &authorizer).await.unwrap();

        assert_eq!(result.access_token.as_deref(), Some("authorized"));
        assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(authorizer.authorizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir);
        let expired = sample_token(Some(-60), Some("revoked"));
        save_token(&config.token_path, &expired).unwrap();
        write_secrets(&config.credentials_path);

        let err = get_credentials(&config, &FailingRefresh).await.unwrap_err();

        assert!(err.to_string().contains("invalid_grant"));
        assert_eq!(load_token(&config.token_path).unwrap(), expired);
    }
}
