//! Invoicing domain module.
//!
//! This crate contains business rules for invoices: the status lifecycle, the
//! edit guard, item replacement and the derived money totals. It is pure
//! domain logic (no IO, no HTTP, no storage).

pub mod invoice;

pub use invoice::{
    Invoice, InvoiceFilter, InvoiceItem, InvoicePatch, InvoiceStatus, ItemInput, NewInvoice,
    PatchOutcome, Payment, PaymentInput, Totals,
};
