use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bilio_core::{ClientId, InvoiceId, UserId};
use bilio_invoicing::{Invoice, InvoiceFilter, InvoicePatch, NewInvoice, PatchOutcome, PaymentInput};

use super::{ServiceError, ServiceResult};
use crate::store::{ClientStore, InvoiceStore};

const INVOICE_NOT_FOUND: &str = "invoice not found";

/// Invoice lifecycle engine.
///
/// ```text
/// create ──► draft ──update──► pending ──update──► overdue
///              │                  │
///              └──── update ──────┴──► cancelled
///
/// mark_paid: any state ──► paid (appends a payment)
/// ```
#[derive(Clone)]
pub struct InvoiceService {
    invoices: Arc<dyn InvoiceStore>,
    clients: Arc<dyn ClientStore>,
}

impl InvoiceService {
    pub fn new(invoices: Arc<dyn InvoiceStore>, clients: Arc<dyn ClientStore>) -> Self {
        Self { invoices, clients }
    }

    #[instrument(skip(self, input), fields(user_id = %user_id, client_id = %input.client_id), err)]
    pub async fn create(&self, user_id: UserId, input: NewInvoice) -> ServiceResult<Invoice> {
        self.ensure_client(user_id, input.client_id).await?;

        let invoice = Invoice::create(user_id, input, Utc::now())?;
        self.invoices.insert(&invoice).await?;

        tracing::info!(
            invoice_id = %invoice.id,
            total = %invoice.total(),
            items = invoice.items.len(),
            "invoice created"
        );
        Ok(invoice)
    }

    /// Patch an editable invoice. A non-empty item list replaces all items
    /// and recomputes totals in the same store write.
    #[instrument(skip(self, patch), fields(user_id = %user_id, invoice_id = %id), err)]
    pub async fn update(&self, id: InvoiceId, user_id: UserId, patch: InvoicePatch) -> ServiceResult<Invoice> {
        let mut invoice = self.load(id, user_id).await?;

        match invoice.apply_patch(patch, Utc::now())? {
            PatchOutcome::ItemsReplaced => self.invoices.replace_items(&invoice).await?,
            PatchOutcome::HeaderOnly => self.invoices.update(&invoice).await?,
        }

        tracing::info!(status = %invoice.status, "invoice updated");
        self.hydrate(invoice).await
    }

    /// Append a payment and force `paid`, whatever the current status.
    ///
    /// Not idempotent: each call records another payment.
    #[instrument(skip(self, input), fields(user_id = %user_id, invoice_id = %id), err)]
    pub async fn mark_paid(&self, id: InvoiceId, user_id: UserId, input: PaymentInput) -> ServiceResult<Invoice> {
        let mut invoice = self.load(id, user_id).await?;
        let previous = invoice.status;

        let payment = invoice.record_payment(input, Utc::now());
        self.invoices.record_payment(&invoice, &payment).await?;

        tracing::info!(
            payment_id = %payment.id,
            amount = %payment.amount,
            from_status = %previous,
            "invoice marked paid"
        );
        self.hydrate(invoice).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, invoice_id = %id), err)]
    pub async fn get(&self, id: InvoiceId, user_id: UserId) -> ServiceResult<Invoice> {
        let invoice = self.load(id, user_id).await?;
        self.hydrate(invoice).await
    }

    /// Headers only, newest first.
    #[instrument(skip(self, filter), fields(user_id = %user_id), err)]
    pub async fn list(&self, user_id: UserId, filter: &InvoiceFilter) -> ServiceResult<Vec<Invoice>> {
        Ok(self.invoices.list(user_id, filter).await?)
    }

    async fn ensure_client(&self, user_id: UserId, client_id: ClientId) -> ServiceResult<()> {
        match self.clients.get(user_id, client_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("client not found")),
        }
    }

    async fn load(&self, id: InvoiceId, user_id: UserId) -> ServiceResult<Invoice> {
        self.invoices
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(INVOICE_NOT_FOUND))
    }

    async fn hydrate(&self, mut invoice: Invoice) -> ServiceResult<Invoice> {
        invoice.items = self.invoices.items(invoice.id).await?;
        invoice.payments = self.invoices.payments(invoice.id).await?;
        Ok(invoice)
    }
}
