//! `bilio-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, ownership traits, money helpers and
//! date ranges shared by every billing module.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod period;

pub use entity::{Entity, Owned};
pub use error::{DomainError, DomainResult};
pub use id::{ClientId, ExpenseId, InvoiceId, InvoiceItemId, PaymentId, UserId};
pub use money::{
    AMOUNT_OUT_OF_RANGE, DEFAULT_CURRENCY, checked_product, checked_sum, currency_or_default,
    percent_of,
};
pub use period::DateRange;
