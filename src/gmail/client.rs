use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Debug, Clone)]
pub struct GmailClient {
    client: Client,
    access_token: String,
    api_base: String,
}

impl GmailClient {
    pub fn new(access_token: String, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            access_token,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Absolute URL for a path below the API base, e.g. `/users/me/drafts`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

#[derive(Debug, Serialize)]
pub struct CreateDraftRequest {
    pub message: RawMessage,
}

#[derive(Debug, Serialize)]
pub struct RawMessage {
    pub raw: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Draft {
    pub id: String,
    pub message: MessageInfo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(rename = "labelIds", default)]
    pub label_ids: Vec<String>,
}
