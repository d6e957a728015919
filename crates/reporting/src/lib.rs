//! Reporting module.
//!
//! Pure read-side aggregation over invoices and expenses: no IO, no caching.
//! Callers fetch the (already filtered) records and hand them in.

pub mod report;

pub use report::{
    ClientProfitability, SummaryReport, TaxExpenseEntry, TaxInvoiceEntry, TaxSummary,
    client_profitability, period_label, summarize, tax_summary,
};
