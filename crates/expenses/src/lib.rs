//! Expense ledger domain module.
//!
//! Expenses have no status machine; this crate validates caller input and
//! filters records. Client linkage is checked by the application layer.

pub mod expense;

pub use expense::{Expense, ExpenseFilter, ExpenseInput};
