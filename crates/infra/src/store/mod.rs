//! Ledger persistence seams.
//!
//! One trait per record family; every lookup is owner-scoped so a record
//! owned by another user reads as absent. Multi-row writes that must land
//! together (invoice header + items, payment + status) are single trait
//! methods so each backend can make them atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bilio_clients::Client;
use bilio_core::{ClientId, ExpenseId, InvoiceId, InvoiceItemId, UserId};
use bilio_expenses::{Expense, ExpenseFilter};
use bilio_invoicing::{Invoice, InvoiceFilter, InvoiceItem, Payment};
use bilio_promotions::{Promocode, WaitlistEntry};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("duplicate record")]
    Duplicate,

    /// Single-use token was already consumed.
    #[error("already used")]
    AlreadyUsed,

    /// The stored record left its editable state before the write landed.
    #[error("record is no longer editable")]
    NotEditable,

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an idempotent insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    Created(T),
    Existing(T),
}

impl<T> InsertOutcome<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            InsertOutcome::Created(v) | InsertOutcome::Existing(v) => v,
        }
    }
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Newest first.
    async fn list(&self, user_id: UserId) -> StoreResult<Vec<Client>>;
    async fn get(&self, user_id: UserId, id: ClientId) -> StoreResult<Option<Client>>;
    async fn insert(&self, client: &Client) -> StoreResult<()>;
    async fn update(&self, client: &Client) -> StoreResult<()>;
    async fn delete(&self, user_id: UserId, id: ClientId) -> StoreResult<()>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Headers only (no items/payments), newest-created first.
    async fn list(&self, user_id: UserId, filter: &InvoiceFilter) -> StoreResult<Vec<Invoice>>;
    /// Header only; callers hydrate with [`InvoiceStore::items`] and [`InvoiceStore::payments`].
    async fn get(&self, user_id: UserId, id: InvoiceId) -> StoreResult<Option<Invoice>>;
    /// Header plus `invoice.items`, atomically.
    async fn insert(&self, invoice: &Invoice) -> StoreResult<()>;
    /// Header fields only. Fails with [`StoreError::NotEditable`] unless the
    /// stored invoice is still draft or pending at write time.
    async fn update(&self, invoice: &Invoice) -> StoreResult<()>;
    /// Header plus a full replacement of the item set, atomically. Same
    /// editability check as [`InvoiceStore::update`].
    async fn replace_items(&self, invoice: &Invoice) -> StoreResult<()>;

    /// Creation order.
    async fn items(&self, invoice_id: InvoiceId) -> StoreResult<Vec<InvoiceItem>>;
    async fn create_item(&self, item: &InvoiceItem) -> StoreResult<()>;
    async fn update_item(&self, item: &InvoiceItem) -> StoreResult<()>;
    async fn delete_item(&self, invoice_id: InvoiceId, item_id: InvoiceItemId) -> StoreResult<()>;

    /// Payment date, newest first.
    async fn payments(&self, invoice_id: InvoiceId) -> StoreResult<Vec<Payment>>;
    async fn create_payment(&self, payment: &Payment) -> StoreResult<()>;
    /// Append `payment` and write the invoice header, atomically.
    async fn record_payment(&self, invoice: &Invoice, payment: &Payment) -> StoreResult<()>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Expense date then creation time, newest first.
    async fn list(&self, user_id: UserId, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>>;
    async fn get(&self, user_id: UserId, id: ExpenseId) -> StoreResult<Option<Expense>>;
    async fn insert(&self, expense: &Expense) -> StoreResult<()>;
    async fn update(&self, expense: &Expense) -> StoreResult<()>;
}

#[async_trait]
pub trait PromocodeStore: Send + Sync {
    /// `Duplicate` when the code already exists.
    async fn insert(&self, code: &Promocode) -> StoreResult<()>;

    /// Atomically look up `code` and stamp `used_at = now`.
    ///
    /// `NotFound` if absent, `AlreadyUsed` if consumed earlier. Of any number
    /// of concurrent callers at most one succeeds.
    async fn find_and_mark_used(&self, code: &str, now: DateTime<Utc>) -> StoreResult<Promocode>;
}

#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn insert_or_get(&self, entry: &WaitlistEntry) -> StoreResult<InsertOutcome<WaitlistEntry>>;
}
