//! In-memory ledger store for tests/dev.
//!
//! Every operation runs under one `RwLock` guard, so the multi-row writes
//! and the promo-code check-and-mark are atomic with respect to each other.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bilio_clients::Client;
use bilio_core::{ClientId, ExpenseId, InvoiceId, InvoiceItemId, Owned, UserId};
use bilio_expenses::{Expense, ExpenseFilter};
use bilio_invoicing::{Invoice, InvoiceFilter, InvoiceItem, Payment};
use bilio_promotions::{Promocode, WaitlistEntry};

use super::{
    ClientStore, ExpenseStore, InsertOutcome, InvoiceStore, PromocodeStore, StoreError,
    StoreResult, WaitlistStore,
};

#[derive(Debug, Default)]
struct Ledger {
    clients: HashMap<ClientId, Client>,
    /// Headers; `items`/`payments` are kept empty here.
    invoices: HashMap<InvoiceId, Invoice>,
    items: HashMap<InvoiceId, Vec<InvoiceItem>>,
    payments: HashMap<InvoiceId, Vec<Payment>>,
    expenses: HashMap<ExpenseId, Expense>,
    promocodes: HashMap<String, Promocode>,
    waitlist: HashMap<String, WaitlistEntry>,
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Ledger>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Ledger>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Ledger>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".to_string()))
    }
}

fn header_of(invoice: &Invoice) -> Invoice {
    let mut header = invoice.clone();
    header.items.clear();
    header.payments.clear();
    header
}

/// The stored header `invoice` would overwrite, checked under the write lock.
fn editable_header<'a>(ledger: &'a mut Ledger, invoice: &Invoice) -> StoreResult<&'a mut Invoice> {
    match ledger.invoices.get_mut(&invoice.id) {
        Some(existing) if existing.is_owned_by(invoice.user_id) => {
            if existing.status.is_editable() {
                Ok(existing)
            } else {
                Err(StoreError::NotEditable)
            }
        }
        _ => Err(StoreError::NotFound),
    }
}

#[async_trait]
impl ClientStore for InMemoryLedgerStore {
    async fn list(&self, user_id: UserId) -> StoreResult<Vec<Client>> {
        let ledger = self.read()?;
        let mut out: Vec<Client> = ledger
            .clients
            .values()
            .filter(|c| c.is_owned_by(user_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(out)
    }

    async fn get(&self, user_id: UserId, id: ClientId) -> StoreResult<Option<Client>> {
        let ledger = self.read()?;
        Ok(ledger.clients.get(&id).filter(|c| c.is_owned_by(user_id)).cloned())
    }

    async fn insert(&self, client: &Client) -> StoreResult<()> {
        let mut ledger = self.write()?;
        if ledger.clients.contains_key(&client.id) {
            return Err(StoreError::Duplicate);
        }
        ledger.clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn update(&self, client: &Client) -> StoreResult<()> {
        let mut ledger = self.write()?;
        match ledger.clients.get_mut(&client.id) {
            Some(existing) if existing.is_owned_by(client.user_id) => {
                *existing = client.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, user_id: UserId, id: ClientId) -> StoreResult<()> {
        let mut ledger = self.write()?;
        match ledger.clients.get(&id) {
            Some(c) if c.is_owned_by(user_id) => {
                ledger.clients.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl InvoiceStore for InMemoryLedgerStore {
    async fn list(&self, user_id: UserId, filter: &InvoiceFilter) -> StoreResult<Vec<Invoice>> {
        let ledger = self.read()?;
        let mut out: Vec<Invoice> = ledger
            .invoices
            .values()
            .filter(|i| i.is_owned_by(user_id) && filter.matches(i))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(out)
    }

    async fn get(&self, user_id: UserId, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        let ledger = self.read()?;
        Ok(ledger.invoices.get(&id).filter(|i| i.is_owned_by(user_id)).cloned())
    }

    async fn insert(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut ledger = self.write()?;
        if ledger.invoices.contains_key(&invoice.id) {
            return Err(StoreError::Duplicate);
        }
        ledger.invoices.insert(invoice.id, header_of(invoice));
        ledger.items.insert(invoice.id, invoice.items.clone());
        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut ledger = self.write()?;
        let existing = editable_header(&mut ledger, invoice)?;
        *existing = header_of(invoice);
        Ok(())
    }

    async fn replace_items(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut ledger = self.write()?;
        let existing = editable_header(&mut ledger, invoice)?;
        *existing = header_of(invoice);
        ledger.items.insert(invoice.id, invoice.items.clone());
        Ok(())
    }

    async fn items(&self, invoice_id: InvoiceId) -> StoreResult<Vec<InvoiceItem>> {
        let ledger = self.read()?;
        Ok(ledger.items.get(&invoice_id).cloned().unwrap_or_default())
    }

    async fn create_item(&self, item: &InvoiceItem) -> StoreResult<()> {
        let mut ledger = self.write()?;
        if !ledger.invoices.contains_key(&item.invoice_id) {
            return Err(StoreError::NotFound);
        }
        let items = ledger.items.entry(item.invoice_id).or_default();
        if items.iter().any(|i| i.id == item.id) {
            return Err(StoreError::Duplicate);
        }
        items.push(item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &InvoiceItem) -> StoreResult<()> {
        let mut ledger = self.write()?;
        let slot = ledger
            .items
            .get_mut(&item.invoice_id)
            .and_then(|items| items.iter_mut().find(|i| i.id == item.id))
            .ok_or(StoreError::NotFound)?;
        *slot = item.clone();
        Ok(())
    }

    async fn delete_item(&self, invoice_id: InvoiceId, item_id: InvoiceItemId) -> StoreResult<()> {
        let mut ledger = self.write()?;
        let items = ledger.items.get_mut(&invoice_id).ok_or(StoreError::NotFound)?;
        let before = items.len();
        items.retain(|i| i.id != item_id);
        if items.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn payments(&self, invoice_id: InvoiceId) -> StoreResult<Vec<Payment>> {
        let ledger = self.read()?;
        let mut out = ledger.payments.get(&invoice_id).cloned().unwrap_or_default();
        out.sort_by(|a, b| {
            b.payment_date
                .cmp(&a.payment_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(out)
    }

    async fn create_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut ledger = self.write()?;
        if !ledger.invoices.contains_key(&payment.invoice_id) {
            return Err(StoreError::NotFound);
        }
        ledger
            .payments
            .entry(payment.invoice_id)
            .or_default()
            .push(payment.clone());
        Ok(())
    }

    async fn record_payment(&self, invoice: &Invoice, payment: &Payment) -> StoreResult<()> {
        let mut ledger = self.write()?;
        match ledger.invoices.get_mut(&invoice.id) {
            Some(existing) if existing.is_owned_by(invoice.user_id) => {
                *existing = header_of(invoice);
            }
            _ => return Err(StoreError::NotFound),
        }
        ledger
            .payments
            .entry(invoice.id)
            .or_default()
            .push(payment.clone());
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for InMemoryLedgerStore {
    async fn list(&self, user_id: UserId, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>> {
        let ledger = self.read()?;
        let mut out: Vec<Expense> = ledger
            .expenses
            .values()
            .filter(|e| e.is_owned_by(user_id) && filter.matches(e))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.expense_date
                .cmp(&a.expense_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(out)
    }

    async fn get(&self, user_id: UserId, id: ExpenseId) -> StoreResult<Option<Expense>> {
        let ledger = self.read()?;
        Ok(ledger.expenses.get(&id).filter(|e| e.is_owned_by(user_id)).cloned())
    }

    async fn insert(&self, expense: &Expense) -> StoreResult<()> {
        let mut ledger = self.write()?;
        if ledger.expenses.contains_key(&expense.id) {
            return Err(StoreError::Duplicate);
        }
        ledger.expenses.insert(expense.id, expense.clone());
        Ok(())
    }

    async fn update(&self, expense: &Expense) -> StoreResult<()> {
        let mut ledger = self.write()?;
        match ledger.expenses.get_mut(&expense.id) {
            Some(existing) if existing.is_owned_by(expense.user_id) => {
                *existing = expense.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl PromocodeStore for InMemoryLedgerStore {
    async fn insert(&self, code: &Promocode) -> StoreResult<()> {
        let mut ledger = self.write()?;
        if ledger.promocodes.contains_key(&code.code) {
            return Err(StoreError::Duplicate);
        }
        ledger.promocodes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find_and_mark_used(&self, code: &str, now: DateTime<Utc>) -> StoreResult<Promocode> {
        let mut ledger = self.write()?;
        let promo = ledger.promocodes.get_mut(code).ok_or(StoreError::NotFound)?;
        if !promo.consume(now) {
            return Err(StoreError::AlreadyUsed);
        }
        Ok(promo.clone())
    }
}

#[async_trait]
impl WaitlistStore for InMemoryLedgerStore {
    async fn insert_or_get(&self, entry: &WaitlistEntry) -> StoreResult<InsertOutcome<WaitlistEntry>> {
        let mut ledger = self.write()?;
        if let Some(existing) = ledger.waitlist.get(&entry.email) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        ledger.waitlist.insert(entry.email.clone(), entry.clone());
        Ok(InsertOutcome::Created(entry.clone()))
    }
}
