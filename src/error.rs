use std::path::PathBuf;
use thiserror::Error;

/// Failures callers need to tell apart. Everything else travels as a plain
/// `anyhow::Error` with context attached.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("{0} environment variable is not set")]
    MissingEnv(&'static str),

    #[error("Credentials file not found at {}", .0.display())]
    CredentialsNotFound(PathBuf),

    #[error("Gmail API error ({status}): {body}")]
    Api { status: u16, body: String },
}
