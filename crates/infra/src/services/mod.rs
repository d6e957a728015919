//! Ledger engines: validate caller input, apply domain rules, persist.
//!
//! Engines hold `Arc<dyn …Store>` handles and nothing else; no locks, no
//! caches. Each public operation is one `async fn` whose only suspension
//! points are store and notifier I/O.

use thiserror::Error;

use bilio_core::DomainError;

use crate::notify::NotifyError;
use crate::store::StoreError;

pub mod clients;
pub mod expenses;
pub mod invoices;
pub mod promocodes;
pub mod reports;
pub mod waitlist;

pub use clients::ClientService;
pub use expenses::ExpenseService;
pub use invoices::InvoiceService;
pub use promocodes::PromocodeService;
pub use reports::ReportService;
pub use waitlist::WaitlistService;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Caller input rejected.
    #[error("{0}")]
    Validation(String),

    /// Absent, or owned by another user.
    #[error("{0}")]
    NotFound(String),

    /// Operation illegal in the record's current state.
    #[error("{0}")]
    InvalidState(String),

    /// Single-use token already consumed.
    #[error("{0}")]
    AlreadyUsed(String),

    /// Bounded retry budget spent.
    #[error("{0}")]
    Exhausted(String),

    /// Storage or delivery failure.
    #[error("{0}")]
    Dependency(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::AlreadyUsed(_) => "already_used",
            ServiceError::Exhausted(_) => "exhausted",
            ServiceError::Dependency(_) => "dependency",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidState(msg) => ServiceError::InvalidState(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound(entity) => ServiceError::NotFound(format!("{entity} not found")),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound("record not found".to_string()),
            StoreError::AlreadyUsed => ServiceError::AlreadyUsed("already used".to_string()),
            StoreError::NotEditable => {
                ServiceError::InvalidState("can only update draft or pending invoices".to_string())
            }
            StoreError::Duplicate => ServiceError::Dependency("duplicate record".to_string()),
            StoreError::Backend(msg) => ServiceError::Dependency(msg),
        }
    }
}

impl From<NotifyError> for ServiceError {
    fn from(value: NotifyError) -> Self {
        ServiceError::Dependency(value.to_string())
    }
}
