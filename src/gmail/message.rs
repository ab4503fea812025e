use anyhow::{Context, Result};
use base64::prelude::*;
use mail_builder::MessageBuilder;
use mail_builder::headers::address::Address;

/// A plaintext message about to become a draft
#[derive(Debug, Clone)]
pub struct DraftMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl DraftMessage {
    pub fn new(to: &str, from: &str, subject: &str, body: &str) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    /// Render the message as RFC 5322 bytes
    pub fn to_mime(&self) -> Result<Vec<u8>> {
        let recipients: Vec<Address> = split_recipients(&self.to)
            .into_iter()
            .map(mailbox)
            .collect();

        let mut builder = MessageBuilder::new()
            .from(mailbox(&self.from))
            .subject(self.subject.as_str())
            .text_body(self.body.as_str());

        // An empty To header is not valid; Gmail stores drafts without recipients fine
        if !recipients.is_empty() {
            builder = builder.to(Address::new_list(recipients));
        }

        builder.write_to_vec().context("Failed to build MIME message")
    }

    /// MIME bytes in the base64url form the Gmail API expects in `raw`
    pub fn encode(&self) -> Result<String> {
        Ok(BASE64_URL_SAFE.encode(self.to_mime()?))
    }
}

/// Split a recipient list on commas that are not inside a quoted display name
fn split_recipients(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, c) in raw.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse "Name <email@example.com>" or a bare address
fn parse_mailbox(raw: &str) -> (Option<&str>, &str) {
    let raw = raw.trim();

    if let (Some(open), true) = (raw.rfind('<'), raw.ends_with('>')) {
        let email = raw[open + 1..raw.len() - 1].trim();
        let name = raw[..open].trim().trim_matches('"').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        return (name, email);
    }

    (None, raw)
}

fn mailbox(raw: &str) -> Address<'_> {
    let (name, email) = parse_mailbox(raw);
    Address::new_address(name, email)
}
