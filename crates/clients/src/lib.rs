//! Client directory domain module.
//!
//! Clients are the billed parties that invoices and expenses reference. This
//! crate holds the record type and its validation rules only (no IO).

pub mod client;

pub use client::{Client, ClientInput, ContactInfo};
