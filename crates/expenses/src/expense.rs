use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bilio_core::{
    ClientId, DateRange, DomainError, DomainResult, Entity, ExpenseId, Owned, UserId,
    currency_or_default,
};

/// A cost incurred by a user, optionally attributed to one of their clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub user_id: UserId,
    pub client_id: Option<ClientId>,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: Option<String>,
    pub expense_date: NaiveDate,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or fully replacing an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseInput {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub category: Option<String>,
    pub expense_date: NaiveDate,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ExpenseInput {
    /// Invariants: description is non-blank, amount is strictly positive.
    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::validation("amount must be greater than 0"));
        }
        Ok(())
    }
}

impl Expense {
    pub fn record(user_id: UserId, input: ExpenseInput, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id: ExpenseId::new(),
            user_id,
            client_id: input.client_id,
            description: input.description.trim().to_string(),
            amount: input.amount,
            currency: currency_or_default(&input.currency),
            category: input.category,
            expense_date: input.expense_date,
            receipt_url: input.receipt_url,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace every mutable field, including clearing optional ones.
    pub fn replace(&mut self, input: ExpenseInput, now: DateTime<Utc>) -> DomainResult<()> {
        input.validate()?;
        self.client_id = input.client_id;
        self.description = input.description.trim().to_string();
        self.amount = input.amount;
        self.currency = currency_or_default(&input.currency);
        self.category = input.category;
        self.expense_date = input.expense_date;
        self.receipt_url = input.receipt_url;
        self.notes = input.notes;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Expense {
    type Id = ExpenseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Expense {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

/// Conjunctive list filter; every criterion is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub client_id: Option<ClientId>,
    /// Exact category match.
    pub category: Option<String>,
    /// Inclusive expense-date range.
    pub incurred: DateRange,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        self.client_id.is_none_or(|c| expense.client_id == Some(c))
            && self
                .category
                .as_deref()
                .is_none_or(|c| expense.category.as_deref() == Some(c))
            && self.incurred.contains(expense.expense_date)
    }
}
