use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bilio_core::{DomainError, DomainResult};

/// Insert attempts before code generation gives up on collisions.
pub const CODE_ATTEMPTS: usize = 5;

/// A single-use token. Once `used_at` is set it never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promocode {
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl Promocode {
    pub fn issue(code: String, now: DateTime<Utc>) -> Self {
        Self {
            code,
            created_at: now,
            used_at: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Mark as consumed. Returns `false` if it already was.
    pub fn consume(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_used() {
            return false;
        }
        self.used_at = Some(now);
        true
    }
}

/// 8 upper-case hex characters from 4 random bytes.
pub fn generate_code() -> String {
    let bytes: [u8; 4] = rand::random();
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Trim and upper-case caller input; blank input is rejected.
pub fn normalize_code(raw: &str) -> DomainResult<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(DomainError::validation("promocode is required"));
    }
    Ok(code.to_uppercase())
}
