pub mod credentials;
pub mod oauth;
pub mod secrets;
pub mod token;

/// Create, read and update drafts; no access to send or delete mail
pub const GMAIL_COMPOSE_SCOPE: &str = "https://www.googleapis.com/auth/gmail.compose";
