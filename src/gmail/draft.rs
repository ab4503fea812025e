use anyhow::{Context, Result};
use log::{error, info};

use super::client::{CreateDraftRequest, Draft, GmailClient, RawMessage};
use super::message::DraftMessage;
use crate::auth::credentials::{Authorizer, get_credentials};
use crate::config::env::Config;
use crate::error::DraftError;

/// Upload a base64url-encoded message into the signed-in account's drafts
pub async fn create_draft(client: &GmailClient, raw: String) -> Result<Draft> {
    let url = client.url("/users/me/drafts");
    let request = CreateDraftRequest {
        message: RawMessage { raw },
    };

    let response = client.client()
        .post(&url)
        .bearer_auth(client.access_token())
        .json(&request)
        .send()
        .await
        .context("Failed to reach Gmail")?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(DraftError::Api { status, body }.into());
    }

    let draft: Draft = response.json().await
        .context("Failed to parse draft response")?;

    info!("Created draft {}", draft.id);
    Ok(draft)
}

/// Authenticate, compose and submit one draft.
///
/// A Gmail API error is reported and turned into `Ok(None)`; every other
/// failure propagates.
pub async fn compose_draft<A>(
    config: &Config,
    authorizer: &A,
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<Option<Draft>>
where
    A: Authorizer + Sync,
{
    let sender = config.sender()?;

    let credential = get_credentials(config, authorizer).await?;
    let access_token = credential
        .access_token
        .context("Credential has no access token")?;
    let client = GmailClient::new(access_token, &config.api_base);

    let raw = DraftMessage::new(recipient, sender, subject, body).encode()?;

    match create_draft(&client, raw).await {
        Ok(draft) => {
            println!("Draft id: {}\nDraft message: {:?}", draft.id, draft.message);
            Ok(Some(draft))
        }
        Err(e) => match e.downcast::<DraftError>() {
            Ok(api_error @ DraftError::Api { .. }) => {
                error!("Draft creation failed: {}", api_error);
                println!("An error occurred: {}", api_error);
                Ok(None)
            }
            Ok(other) => Err(other.into()),
            Err(e) => Err(e),
        },
    }
}
