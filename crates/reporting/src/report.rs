use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bilio_clients::Client;
use bilio_core::{AMOUNT_OUT_OF_RANGE, ClientId, DomainError, DomainResult, checked_sum};
use bilio_expenses::Expense;
use bilio_invoicing::{Invoice, InvoiceStatus};

/// Period-level overview of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
    pub outstanding_invoices: usize,
    pub paid_invoices: usize,
    pub total_invoices: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfitability {
    pub client_id: ClientId,
    pub client_name: String,
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_profit: Decimal,
    /// Percentage of revenue kept as profit; `0` when there is no revenue.
    pub profit_margin: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInvoiceEntry {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub client_name: String,
    pub amount: Decimal,
    pub tax_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxExpenseEntry {
    pub description: String,
    pub date: NaiveDate,
    pub category: String,
    pub amount: Decimal,
}

/// Revenue and deductible expenses over a closed date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub period: String,
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
    pub invoices: Vec<TaxInvoiceEntry>,
    pub expenses: Vec<TaxExpenseEntry>,
}

/// Revenue counts only `paid` invoices.
fn paid_revenue(invoices: &[Invoice]) -> DomainResult<Decimal> {
    checked_sum(
        invoices
            .iter()
            .filter(|inv| inv.status == InvoiceStatus::Paid)
            .map(Invoice::total),
    )
}

fn expense_total(expenses: &[Expense]) -> DomainResult<Decimal> {
    checked_sum(expenses.iter().map(|e| e.amount))
}

fn net(revenue: Decimal, expenses: Decimal) -> DomainResult<Decimal> {
    revenue
        .checked_sub(expenses)
        .ok_or_else(|| DomainError::validation(AMOUNT_OUT_OF_RANGE))
}

/// Aggregate already-filtered invoices and expenses.
pub fn summarize(invoices: &[Invoice], expenses: &[Expense]) -> DomainResult<SummaryReport> {
    let total_revenue = paid_revenue(invoices)?;
    let total_expenses = expense_total(expenses)?;

    Ok(SummaryReport {
        total_revenue,
        total_expenses,
        net_profit: net(total_revenue, total_expenses)?,
        outstanding_invoices: invoices.iter().filter(|i| i.status.is_outstanding()).count(),
        paid_invoices: invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Paid)
            .count(),
        total_invoices: invoices.len(),
    })
}

/// Same math as [`summarize`], scoped to one client's records.
pub fn client_profitability(
    client: &Client,
    invoices: &[Invoice],
    expenses: &[Expense],
) -> DomainResult<ClientProfitability> {
    let total_revenue = paid_revenue(invoices)?;
    let total_expenses = expense_total(expenses)?;
    let net_profit = net(total_revenue, total_expenses)?;
    let profit_margin = if total_revenue.is_zero() {
        Decimal::ZERO
    } else {
        net_profit
            .checked_div(total_revenue)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| DomainError::validation(AMOUNT_OUT_OF_RANGE))?
    };

    Ok(ClientProfitability {
        client_id: client.id,
        client_name: client.name.clone(),
        total_revenue,
        total_expenses,
        net_profit,
        profit_margin,
    })
}

/// `"YYYY-MM to YYYY-MM"`.
pub fn period_label(from: NaiveDate, to: NaiveDate) -> String {
    format!("{} to {}", from.format("%Y-%m"), to.format("%Y-%m"))
}

/// Build the tax-period report.
///
/// Records are expected to be filtered to `[from, to]` already. Client names
/// missing from `client_names` render as an empty string.
pub fn tax_summary(
    from: NaiveDate,
    to: NaiveDate,
    invoices: &[Invoice],
    expenses: &[Expense],
    client_names: &HashMap<ClientId, String>,
) -> DomainResult<TaxSummary> {
    if from > to {
        return Err(DomainError::validation("from_date must not be after to_date"));
    }

    let invoice_entries: Vec<TaxInvoiceEntry> = invoices
        .iter()
        .filter(|inv| inv.status == InvoiceStatus::Paid)
        .map(|inv| TaxInvoiceEntry {
            invoice_number: inv.invoice_number.clone(),
            date: inv.issue_date,
            client_name: client_names.get(&inv.client_id).cloned().unwrap_or_default(),
            amount: inv.total(),
            tax_amount: inv.tax_amount(),
        })
        .collect();

    let expense_entries: Vec<TaxExpenseEntry> = expenses
        .iter()
        .map(|exp| TaxExpenseEntry {
            description: exp.description.clone(),
            date: exp.expense_date,
            category: exp.category.clone().unwrap_or_default(),
            amount: exp.amount,
        })
        .collect();

    let total_revenue = checked_sum(invoice_entries.iter().map(|e| e.amount))?;
    let total_expenses = expense_total(expenses)?;

    Ok(TaxSummary {
        period: period_label(from, to),
        total_revenue,
        total_expenses,
        net_income: net(total_revenue, total_expenses)?,
        invoices: invoice_entries,
        expenses: expense_entries,
    })
}
