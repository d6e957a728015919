//! Postgres-backed ledger store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Backend` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |
//!
//! ## Atomicity
//!
//! `InvoiceStore::insert`, `update`, `replace_items` and `record_payment` run
//! in one transaction each. Redemption locks the code row with
//! `SELECT … FOR UPDATE` so concurrent redeemers serialize on it. Invoice edits
//! lock the header row the same way and re-check the stored status, so an edit
//! built from a stale read cannot overwrite a payment that landed meanwhile.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use bilio_clients::{Client, ContactInfo};
use bilio_core::{ClientId, ExpenseId, InvoiceId, InvoiceItemId, PaymentId, UserId};
use bilio_expenses::{Expense, ExpenseFilter};
use bilio_invoicing::{Invoice, InvoiceFilter, InvoiceItem, InvoiceStatus, Payment, Totals};
use bilio_promotions::{Promocode, WaitlistEntry};

use super::{
    ClientStore, ExpenseStore, InsertOutcome, InvoiceStore, PromocodeStore, StoreError,
    StoreResult, WaitlistStore,
};

const SCHEMA: &str = include_str!("schema.sql");

const CLIENT_COLUMNS: &str =
    "id, user_id, name, email, company, phone, address, tax_id, currency, created_at, updated_at";

const INVOICE_COLUMNS: &str = "id, user_id, client_id, invoice_number, status, issue_date, due_date, \
     currency, subtotal, tax_rate, tax_amount, total, notes, payment_link, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, invoice_id, description, quantity, unit_price, amount, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, invoice_id, amount, currency, payment_method, transaction_id, \
     notes, payment_date, created_at";

const EXPENSE_COLUMNS: &str = "id, user_id, client_id, description, amount, currency, category, \
     expense_date, receipt_url, notes, created_at, updated_at";

/// Postgres implementation of every ledger store trait.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; the store can be
/// shared behind `Arc<dyn …Store>` handles.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: Arc<PgPool>,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the ledger DDL. Safe to run on every start-up.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl ClientStore for PgLedgerStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list(&self, user_id: UserId) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(*user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_clients", e))?;

        rows.iter()
            .map(client_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_client", e))
    }

    #[instrument(skip(self), fields(user_id = %user_id, client_id = %id), err)]
    async fn get(&self, user_id: UserId, id: ClientId) -> StoreResult<Option<Client>> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND user_id = $2"
        ))
        .bind(*id.as_uuid())
        .bind(*user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_client", e))?;

        row.as_ref()
            .map(client_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_client", e))
    }

    #[instrument(skip(self, client), fields(client_id = %client.id), err)]
    async fn insert(&self, client: &Client) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO clients ({CLIENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(*client.id.as_uuid())
        .bind(*client.user_id.as_uuid())
        .bind(&client.name)
        .bind(&client.contact.email)
        .bind(&client.contact.company)
        .bind(&client.contact.phone)
        .bind(&client.contact.address)
        .bind(&client.contact.tax_id)
        .bind(&client.currency)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_client", e))?;
        Ok(())
    }

    #[instrument(skip(self, client), fields(client_id = %client.id), err)]
    async fn update(&self, client: &Client) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = $3, email = $4, company = $5, phone = $6, address = $7,
                tax_id = $8, currency = $9, updated_at = $10
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(*client.id.as_uuid())
        .bind(*client.user_id.as_uuid())
        .bind(&client.name)
        .bind(&client.contact.email)
        .bind(&client.contact.company)
        .bind(&client.contact.phone)
        .bind(&client.contact.address)
        .bind(&client.contact.tax_id)
        .bind(&client.currency)
        .bind(client.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_client", e))?;

        expect_one_row(result.rows_affected())
    }

    #[instrument(skip(self), fields(user_id = %user_id, client_id = %id), err)]
    async fn delete(&self, user_id: UserId, id: ClientId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND user_id = $2")
            .bind(*id.as_uuid())
            .bind(*user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_client", e))?;

        expect_one_row(result.rows_affected())
    }
}

#[async_trait]
impl InvoiceStore for PgLedgerStore {
    #[instrument(skip(self, filter), fields(user_id = %user_id, row_count = tracing::field::Empty), err)]
    async fn list(&self, user_id: UserId, filter: &InvoiceFilter) -> StoreResult<Vec<Invoice>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = "
        ));
        qb.push_bind(*user_id.as_uuid());
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND client_id = ").push_bind(*client_id.as_uuid());
        }
        if let Some(from) = filter.issued.from {
            qb.push(" AND issue_date >= ").push_bind(from);
        }
        if let Some(to) = filter.issued.to {
            qb.push(" AND issue_date <= ").push_bind(to);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_invoices", e))?;

        Span::current().record("row_count", rows.len());
        rows.iter()
            .map(invoice_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_invoice", e))
    }

    #[instrument(skip(self), fields(user_id = %user_id, invoice_id = %id), err)]
    async fn get(&self, user_id: UserId, id: InvoiceId) -> StoreResult<Option<Invoice>> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND user_id = $2"
        ))
        .bind(*id.as_uuid())
        .bind(*user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_invoice", e))?;

        row.as_ref()
            .map(invoice_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_invoice", e))
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id, item_count = invoice.items.len()), err)]
    async fn insert(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(&format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(*invoice.id.as_uuid())
        .bind(*invoice.user_id.as_uuid())
        .bind(*invoice.client_id.as_uuid())
        .bind(&invoice.invoice_number)
        .bind(invoice.status.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(&invoice.currency)
        .bind(invoice.subtotal())
        .bind(invoice.tax_rate)
        .bind(invoice.tax_amount())
        .bind(invoice.total())
        .bind(&invoice.notes)
        .bind(&invoice.payment_link)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_invoice", e))?;

        for item in &invoice.items {
            insert_item(&mut *tx, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id), err)]
    async fn update(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        lock_editable(&mut *tx, invoice).await?;
        update_header(&mut *tx, invoice).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id, item_count = invoice.items.len()), err)]
    async fn replace_items(&self, invoice: &Invoice) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        lock_editable(&mut *tx, invoice).await?;
        update_header(&mut *tx, invoice).await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(*invoice.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_items", e))?;

        for item in &invoice.items {
            insert_item(&mut *tx, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id), err)]
    async fn items(&self, invoice_id: InvoiceId) -> StoreResult<Vec<InvoiceItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = $1 ORDER BY created_at, id"
        ))
        .bind(*invoice_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter()
            .map(item_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_item", e))
    }

    #[instrument(skip(self, item), fields(invoice_id = %item.invoice_id), err)]
    async fn create_item(&self, item: &InvoiceItem) -> StoreResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        insert_item(&mut *conn, item).await
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn update_item(&self, item: &InvoiceItem) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoice_items
            SET description = $3, quantity = $4, unit_price = $5, amount = $6, updated_at = $7
            WHERE id = $1 AND invoice_id = $2
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(*item.invoice_id.as_uuid())
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.amount)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        expect_one_row(result.rows_affected())
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id, item_id = %item_id), err)]
    async fn delete_item(&self, invoice_id: InvoiceId, item_id: InvoiceItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM invoice_items WHERE id = $1 AND invoice_id = $2")
            .bind(*item_id.as_uuid())
            .bind(*invoice_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        expect_one_row(result.rows_affected())
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id), err)]
    async fn payments(&self, invoice_id: InvoiceId) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 \
             ORDER BY payment_date DESC, created_at DESC"
        ))
        .bind(*invoice_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_payments", e))?;

        rows.iter()
            .map(payment_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_payment", e))
    }

    #[instrument(skip(self, payment), fields(invoice_id = %payment.invoice_id), err)]
    async fn create_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        insert_payment(&mut *conn, payment).await
    }

    #[instrument(skip(self, invoice, payment), fields(invoice_id = %invoice.id, payment_id = %payment.id), err)]
    async fn record_payment(&self, invoice: &Invoice, payment: &Payment) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        insert_payment(&mut *tx, payment).await?;
        update_header(&mut *tx, invoice).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for PgLedgerStore {
    #[instrument(skip(self, filter), fields(user_id = %user_id), err)]
    async fn list(&self, user_id: UserId, filter: &ExpenseFilter) -> StoreResult<Vec<Expense>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE user_id = "
        ));
        qb.push_bind(*user_id.as_uuid());
        if let Some(client_id) = filter.client_id {
            qb.push(" AND client_id = ").push_bind(*client_id.as_uuid());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(from) = filter.incurred.from {
            qb.push(" AND expense_date >= ").push_bind(from);
        }
        if let Some(to) = filter.incurred.to {
            qb.push(" AND expense_date <= ").push_bind(to);
        }
        qb.push(" ORDER BY expense_date DESC, created_at DESC, id DESC");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_expenses", e))?;

        rows.iter()
            .map(expense_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_expense", e))
    }

    #[instrument(skip(self), fields(user_id = %user_id, expense_id = %id), err)]
    async fn get(&self, user_id: UserId, id: ExpenseId) -> StoreResult<Option<Expense>> {
        let row = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2"
        ))
        .bind(*id.as_uuid())
        .bind(*user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_expense", e))?;

        row.as_ref()
            .map(expense_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("decode_expense", e))
    }

    #[instrument(skip(self, expense), fields(expense_id = %expense.id), err)]
    async fn insert(&self, expense: &Expense) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO expenses ({EXPENSE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(*expense.id.as_uuid())
        .bind(*expense.user_id.as_uuid())
        .bind(expense.client_id.map(|c| *c.as_uuid()))
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(&expense.category)
        .bind(expense.expense_date)
        .bind(&expense.receipt_url)
        .bind(&expense.notes)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_expense", e))?;
        Ok(())
    }

    #[instrument(skip(self, expense), fields(expense_id = %expense.id), err)]
    async fn update(&self, expense: &Expense) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET client_id = $3, description = $4, amount = $5, currency = $6, category = $7,
                expense_date = $8, receipt_url = $9, notes = $10, updated_at = $11
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(*expense.id.as_uuid())
        .bind(*expense.user_id.as_uuid())
        .bind(expense.client_id.map(|c| *c.as_uuid()))
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(&expense.category)
        .bind(expense.expense_date)
        .bind(&expense.receipt_url)
        .bind(&expense.notes)
        .bind(expense.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_expense", e))?;

        expect_one_row(result.rows_affected())
    }
}

#[async_trait]
impl PromocodeStore for PgLedgerStore {
    #[instrument(skip(self, code), err)]
    async fn insert(&self, code: &Promocode) -> StoreResult<()> {
        sqlx::query("INSERT INTO promocodes (code, created_at, used_at) VALUES ($1, $2, $3)")
            .bind(&code.code)
            .bind(code.created_at)
            .bind(code.used_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_promocode", e))?;
        Ok(())
    }

    #[instrument(skip(self, code), err)]
    async fn find_and_mark_used(&self, code: &str, now: DateTime<Utc>) -> StoreResult<Promocode> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT code, created_at, used_at FROM promocodes WHERE code = $1 FOR UPDATE")
            .bind(code)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_promocode", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound);
        };

        let mut promo = promocode_from_row(&row).map_err(|e| map_sqlx_error("decode_promocode", e))?;
        if !promo.consume(now) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::AlreadyUsed);
        }

        sqlx::query("UPDATE promocodes SET used_at = $2 WHERE code = $1")
            .bind(code)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("mark_promocode_used", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(promo)
    }
}

#[async_trait]
impl WaitlistStore for PgLedgerStore {
    #[instrument(skip(self, entry), err)]
    async fn insert_or_get(&self, entry: &WaitlistEntry) -> StoreResult<InsertOutcome<WaitlistEntry>> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO waitlist_entries (email, joined_at)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING email, joined_at
            "#,
        )
        .bind(&entry.email)
        .bind(entry.joined_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_waitlist_entry", e))?;

        if let Some(row) = inserted {
            let created = waitlist_from_row(&row).map_err(|e| map_sqlx_error("decode_waitlist_entry", e))?;
            return Ok(InsertOutcome::Created(created));
        }

        let row = sqlx::query("SELECT email, joined_at FROM waitlist_entries WHERE email = $1")
            .bind(&entry.email)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_waitlist_entry", e))?;

        let existing = waitlist_from_row(&row).map_err(|e| map_sqlx_error("decode_waitlist_entry", e))?;
        Ok(InsertOutcome::Existing(existing))
    }
}

async fn insert_item(conn: &mut PgConnection, item: &InvoiceItem) -> StoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO invoice_items ({ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
    ))
    .bind(*item.id.as_uuid())
    .bind(*item.invoice_id.as_uuid())
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.amount)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(conn)
    .await
    .map_err(|e| map_sqlx_error("insert_item", e))?;
    Ok(())
}

async fn insert_payment(conn: &mut PgConnection, payment: &Payment) -> StoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO payments ({PAYMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
    ))
    .bind(*payment.id.as_uuid())
    .bind(*payment.invoice_id.as_uuid())
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(&payment.method)
    .bind(&payment.transaction_id)
    .bind(&payment.notes)
    .bind(payment.payment_date)
    .bind(payment.created_at)
    .execute(conn)
    .await
    .map_err(|e| map_sqlx_error("insert_payment", e))?;
    Ok(())
}

/// Row-lock the stored header and fail unless it still accepts edits.
async fn lock_editable(conn: &mut PgConnection, invoice: &Invoice) -> StoreResult<()> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(*invoice.id.as_uuid())
            .bind(*invoice.user_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("lock_invoice", e))?;

    let status: InvoiceStatus = status
        .ok_or(StoreError::NotFound)?
        .parse::<InvoiceStatus>()
        .map_err(|e| map_sqlx_error("decode_invoice_status", decode_err(e)))?;

    if status.is_editable() {
        Ok(())
    } else {
        Err(StoreError::NotEditable)
    }
}

async fn update_header(conn: &mut PgConnection, invoice: &Invoice) -> StoreResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET status = $3, issue_date = $4, due_date = $5, currency = $6, subtotal = $7,
            tax_rate = $8, tax_amount = $9, total = $10, notes = $11, payment_link = $12,
            updated_at = $13
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(*invoice.id.as_uuid())
    .bind(*invoice.user_id.as_uuid())
    .bind(invoice.status.as_str())
    .bind(invoice.issue_date)
    .bind(invoice.due_date)
    .bind(&invoice.currency)
    .bind(invoice.subtotal())
    .bind(invoice.tax_rate)
    .bind(invoice.tax_amount())
    .bind(invoice.total())
    .bind(&invoice.notes)
    .bind(&invoice.payment_link)
    .bind(invoice.updated_at)
    .execute(conn)
    .await
    .map_err(|e| map_sqlx_error("update_invoice", e))?;

    expect_one_row(result.rows_affected())
}

fn expect_one_row(rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Duplicate;
            }
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

// Row mapping

fn decode_err(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

fn client_from_row(row: &PgRow) -> Result<Client, sqlx::Error> {
    Ok(Client {
        id: ClientId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        name: row.try_get("name")?,
        contact: ContactInfo {
            email: row.try_get("email")?,
            company: row.try_get("company")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            tax_id: row.try_get("tax_id")?,
        },
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn invoice_from_row(row: &PgRow) -> Result<Invoice, sqlx::Error> {
    let status: InvoiceStatus = row
        .try_get::<String, _>("status")?
        .parse()
        .map_err(decode_err)?;

    Ok(Invoice {
        id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        client_id: ClientId::from_uuid(row.try_get::<Uuid, _>("client_id")?),
        invoice_number: row.try_get("invoice_number")?,
        status,
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        currency: row.try_get("currency")?,
        tax_rate: row.try_get("tax_rate")?,
        totals: Totals::from_stored(
            row.try_get("subtotal")?,
            row.try_get("tax_amount")?,
            row.try_get("total")?,
        ),
        notes: row.try_get("notes")?,
        payment_link: row.try_get("payment_link")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        items: Vec::new(),
        payments: Vec::new(),
    })
}

fn item_from_row(row: &PgRow) -> Result<InvoiceItem, sqlx::Error> {
    Ok(InvoiceItem {
        id: InvoiceItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        invoice_id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("invoice_id")?),
        description: row.try_get("description")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> Result<Payment, sqlx::Error> {
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        invoice_id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("invoice_id")?),
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        method: row.try_get("payment_method")?,
        transaction_id: row.try_get("transaction_id")?,
        notes: row.try_get("notes")?,
        payment_date: row.try_get("payment_date")?,
        created_at: row.try_get("created_at")?,
    })
}

fn expense_from_row(row: &PgRow) -> Result<Expense, sqlx::Error> {
    Ok(Expense {
        id: ExpenseId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        client_id: row
            .try_get::<Option<Uuid>, _>("client_id")?
            .map(ClientId::from_uuid),
        description: row.try_get("description")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        category: row.try_get("category")?,
        expense_date: row.try_get("expense_date")?,
        receipt_url: row.try_get("receipt_url")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn promocode_from_row(row: &PgRow) -> Result<Promocode, sqlx::Error> {
    Ok(Promocode {
        code: row.try_get("code")?,
        created_at: row.try_get("created_at")?,
        used_at: row.try_get("used_at")?,
    })
}

fn waitlist_from_row(row: &PgRow) -> Result<WaitlistEntry, sqlx::Error> {
    Ok(WaitlistEntry {
        email: row.try_get("email")?,
        joined_at: row.try_get("joined_at")?,
    })
}
