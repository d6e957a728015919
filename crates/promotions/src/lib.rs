//! Promotions module: single-use promo-codes and the waitlist they gate.
//!
//! Pure domain logic only; atomic consumption lives in the store.

pub mod promocode;
pub mod waitlist;

pub use promocode::{CODE_ATTEMPTS, Promocode, generate_code, normalize_code};
pub use waitlist::{DEFAULT_WAITLIST_DOMAIN, WaitlistEntry, normalize_email};
