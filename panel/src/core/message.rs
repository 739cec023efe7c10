//! Commit message and authorship rules for the publish flow.

use crate::error::{PanelError, PanelResult};

/// Appended to messages cut at the configured limit.
pub const TRUNCATION_MARKER: char = '…';

/// Pick the commit message: the trimmed request message, or `default` when
/// absent or blank. Messages longer than `limit` characters keep their first
/// `limit` characters followed by [`TRUNCATION_MARKER`].
pub fn commit_message(requested: Option<&str>, default: &str, limit: usize) -> String {
    let message = requested
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(default);
    truncate_message(message, limit)
}

pub fn truncate_message(message: &str, limit: usize) -> String {
    match message.char_indices().nth(limit) {
        Some((cut, _)) => {
            let mut out = message[..cut].to_string();
            out.push(TRUNCATION_MARKER);
            out
        }
        None => message.to_string(),
    }
}

/// Author recorded on commits made on behalf of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: String,
}

impl AuthorIdentity {
    /// Build an identity from an e-mail address; the local part becomes the name.
    pub fn from_email(email: &str) -> PanelResult<Self> {
        let email = email.trim();
        let invalid = || PanelError::validation(format!("invalid author e-mail: '{email}'"));
        if email.chars().any(|c| c.is_whitespace() || matches!(c, '<' | '>')) {
            return Err(invalid());
        }
        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        Ok(Self {
            name: local.to_string(),
            email: email.to_string(),
        })
    }

    /// Value for `git commit --author`.
    pub fn to_author_arg(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}
