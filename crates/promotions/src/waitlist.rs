use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

use bilio_core::{DomainError, DomainResult};

/// Mail provider accepted when nothing else is configured.
pub const DEFAULT_WAITLIST_DOMAIN: &str = "gmail.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn new(email: String, now: DateTime<Utc>) -> Self {
        Self {
            email,
            joined_at: now,
        }
    }
}

/// Canonical waitlist email: the lower-cased address part of a mailbox on
/// `allowed_domain`. A display name (`Jane <jane@gmail.com>`) is dropped.
pub fn normalize_email(raw: &str, allowed_domain: &str) -> DomainResult<String> {
    let raw = raw.trim().to_lowercase();
    if raw.is_empty() {
        return Err(DomainError::validation("email is required"));
    }

    let mailbox: Mailbox = raw
        .parse()
        .map_err(|_| DomainError::validation("invalid email address"))?;
    let address = mailbox.email;

    if !address.domain().eq_ignore_ascii_case(allowed_domain.trim()) {
        return Err(DomainError::validation(format!(
            "only {allowed_domain} addresses can join the waitlist"
        )));
    }

    Ok(address.to_string())
}
