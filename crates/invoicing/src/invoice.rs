use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bilio_core::{
    ClientId, DateRange, DomainError, DomainResult, Entity, InvoiceId, InvoiceItemId, Owned,
    PaymentId, UserId, checked_product, checked_sum, currency_or_default, percent_of,
};

/// Invoice status lifecycle.
///
/// ```text
/// draft ──► pending ──► overdue (set externally)
///   │          │
///   └──────────┴──► paid / cancelled
/// ```
///
/// Only `draft` and `pending` invoices accept edits. Recording a payment
/// forces `paid` from any state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Whether header fields and items may still be changed.
    pub fn is_editable(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Pending)
    }

    /// Issued but not yet settled.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::Overdue)
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "invalid status '{other}': expected one of draft, pending, paid, overdue, cancelled"
            ))),
        }
    }
}

/// Derived money totals of an invoice.
///
/// Fields are private: the only ways to obtain a value are [`Totals::compute`]
/// and [`Totals::from_stored`] (for storage adapters reading persisted rows).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    subtotal: Decimal,
    tax_amount: Decimal,
    total: Decimal,
}

impl Totals {
    /// `subtotal = Σ qty×price`, `tax = subtotal × rate / 100`,
    /// `total = subtotal + tax`. Nothing is rounded.
    pub fn compute<'a, I>(items: I, tax_rate: Decimal) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a InvoiceItem>,
    {
        let subtotal = checked_sum(items.into_iter().map(|item| item.amount))?;
        let tax_amount = percent_of(subtotal, tax_rate)?;
        let total = checked_sum([subtotal, tax_amount])?;
        Ok(Self {
            subtotal,
            tax_amount,
            total,
        })
    }

    pub fn from_stored(subtotal: Decimal, tax_amount: Decimal, total: Decimal) -> Self {
        Self {
            subtotal,
            tax_amount,
            total,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn total(&self) -> Decimal {
        self.total
    }
}

/// Line item payload supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Invoice line; `amount` is always `quantity × unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceId,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvoiceItem {
    pub fn from_input(invoice_id: InvoiceId, input: ItemInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: InvoiceItemId::new(),
            invoice_id,
            amount: checked_product(input.quantity, input.unit_price)?,
            description: input.description,
            quantity: input.quantity,
            unit_price: input.unit_price,
            created_at: now,
            updated_at: now,
        })
    }

    fn build_all(invoice_id: InvoiceId, inputs: Vec<ItemInput>, now: DateTime<Utc>) -> DomainResult<Vec<Self>> {
        inputs
            .into_iter()
            .map(|item| Self::from_input(invoice_id, item, now))
            .collect()
    }
}

/// Payment payload supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default, alias = "payment_method")]
    pub method: Option<String>,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A payment recorded against an invoice. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    pub currency: String,
    pub method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub payment_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub client_id: ClientId,
    pub invoice_number: String,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInput>,
}

/// Partial update of an editable invoice.
///
/// `currency` and `tax_rate` are always written (their defaults included);
/// the other header fields only when present. A non-empty `items` list
/// replaces every existing item and recomputes the totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<ItemInput>>,
}

/// What a patch touched, so the caller can persist the right unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    HeaderOnly,
    ItemsReplaced,
}

/// Conjunctive list filter; every criterion is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<ClientId>,
    /// Inclusive issue-date range.
    pub issued: DateRange,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.status.is_none_or(|s| invoice.status == s)
            && self.client_id.is_none_or(|c| invoice.client_id == c)
            && self.issued.contains(invoice.issue_date)
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub user_id: UserId,
    pub client_id: ClientId,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub tax_rate: Decimal,
    #[serde(flatten)]
    pub totals: Totals,
    pub notes: Option<String>,
    pub payment_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Invoice {
    /// Validate caller input and build a new invoice with its items.
    ///
    /// Client ownership is checked by the caller before this runs.
    pub fn create(user_id: UserId, input: NewInvoice, now: DateTime<Utc>) -> DomainResult<Self> {
        let invoice_number = input.invoice_number.trim();
        if invoice_number.is_empty() {
            return Err(DomainError::validation("invoice_number is required"));
        }
        if input.items.is_empty() {
            return Err(DomainError::validation("at least one item is required"));
        }

        let id = InvoiceId::new();
        let items = InvoiceItem::build_all(id, input.items, now)?;
        let totals = Totals::compute(&items, input.tax_rate)?;

        Ok(Self {
            id,
            user_id,
            client_id: input.client_id,
            invoice_number: invoice_number.to_string(),
            status: input.status.unwrap_or_default(),
            issue_date: input.issue_date,
            due_date: input.due_date,
            currency: currency_or_default(&input.currency),
            tax_rate: input.tax_rate,
            totals,
            notes: input.notes,
            payment_link: None,
            created_at: now,
            updated_at: now,
            items,
            payments: Vec::new(),
        })
    }

    pub fn subtotal(&self) -> Decimal {
        self.totals.subtotal()
    }

    pub fn tax_amount(&self) -> Decimal {
        self.totals.tax_amount()
    }

    pub fn total(&self) -> Decimal {
        self.totals.total()
    }

    /// Invariant: only draft or pending invoices may be edited.
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if !self.status.is_editable() {
            return Err(DomainError::invalid_state(format!(
                "can only update draft or pending invoices (status is {})",
                self.status
            )));
        }
        Ok(())
    }

    /// Apply a partial update. Fails with `InvalidState` unless editable.
    ///
    /// Replacement items and their totals are computed before anything is
    /// assigned, so a failing patch leaves the invoice untouched.
    pub fn apply_patch(&mut self, patch: InvoicePatch, now: DateTime<Utc>) -> DomainResult<PatchOutcome> {
        self.ensure_editable()?;

        let replacement = match patch.items {
            Some(items) if !items.is_empty() => {
                let items = InvoiceItem::build_all(self.id, items, now)?;
                let totals = Totals::compute(&items, patch.tax_rate)?;
                Some((items, totals))
            }
            _ => None,
        };

        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(issue_date) = patch.issue_date {
            self.issue_date = issue_date;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }
        self.currency = patch.currency;
        self.tax_rate = patch.tax_rate;
        self.updated_at = now;

        match replacement {
            Some((items, totals)) => {
                self.items = items;
                self.totals = totals;
                Ok(PatchOutcome::ItemsReplaced)
            }
            None => Ok(PatchOutcome::HeaderOnly),
        }
    }

    /// Build a payment and force the invoice to `paid`, whatever its state.
    ///
    /// The amount is not reconciled against the total. The returned payment
    /// is not pushed onto `payments`; the store owns that collection.
    pub fn record_payment(&mut self, input: PaymentInput, now: DateTime<Utc>) -> Payment {
        let currency = if input.currency.trim().is_empty() {
            self.currency.clone()
        } else {
            input.currency
        };

        self.status = InvoiceStatus::Paid;
        self.updated_at = now;

        Payment {
            id: PaymentId::new(),
            invoice_id: self.id,
            amount: input.amount,
            currency,
            method: input.method,
            transaction_id: input.transaction_id,
            notes: input.notes,
            payment_date: input.payment_date,
            created_at: now,
        }
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Invoice {
    fn owner(&self) -> UserId {
        self.user_id
    }
}
