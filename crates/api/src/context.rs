use bilio_auth::Claims;
use bilio_core::UserId;

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware and required by every ledger route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    user_id: UserId,
    email: Option<String>,
}

impl CallerContext {
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self { user_id, email }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl From<Claims> for CallerContext {
    fn from(claims: Claims) -> Self {
        Self::new(claims.sub, claims.email)
    }
}
