use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;

use bilio_core::{ClientId, DateRange, UserId};
use bilio_expenses::{Expense, ExpenseFilter};
use bilio_invoicing::{Invoice, InvoiceFilter};
use bilio_reporting::{ClientProfitability, SummaryReport, TaxSummary};

use super::{ServiceError, ServiceResult};
use crate::store::{ClientStore, ExpenseStore, InvoiceStore};

/// Read-side aggregation. Every call re-queries the stores.
#[derive(Clone)]
pub struct ReportService {
    clients: Arc<dyn ClientStore>,
    invoices: Arc<dyn InvoiceStore>,
    expenses: Arc<dyn ExpenseStore>,
}

impl ReportService {
    pub fn new(
        clients: Arc<dyn ClientStore>,
        invoices: Arc<dyn InvoiceStore>,
        expenses: Arc<dyn ExpenseStore>,
    ) -> Self {
        Self {
            clients,
            invoices,
            expenses,
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    pub async fn summary(&self, user_id: UserId, range: DateRange) -> ServiceResult<SummaryReport> {
        let (invoices, expenses) = self.fetch(user_id, None, range).await?;
        Ok(bilio_reporting::summarize(&invoices, &expenses)?)
    }

    #[instrument(skip(self), fields(user_id = %user_id, client_id = %client_id), err)]
    pub async fn client_profitability(
        &self,
        user_id: UserId,
        client_id: ClientId,
        range: DateRange,
    ) -> ServiceResult<ClientProfitability> {
        let client = self
            .clients
            .get(user_id, client_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("client not found"))?;

        let (invoices, expenses) = self.fetch(user_id, Some(client_id), range).await?;
        Ok(bilio_reporting::client_profitability(&client, &invoices, &expenses)?)
    }

    #[instrument(skip(self), fields(user_id = %user_id, from = %from, to = %to), err)]
    pub async fn tax_summary(&self, user_id: UserId, from: NaiveDate, to: NaiveDate) -> ServiceResult<TaxSummary> {
        if from > to {
            return Err(ServiceError::validation("from_date must not be after to_date"));
        }

        let (invoices, expenses) = self.fetch(user_id, None, DateRange::between(from, to)).await?;
        let names: HashMap<ClientId, String> = self
            .clients
            .list(user_id)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(bilio_reporting::tax_summary(from, to, &invoices, &expenses, &names)?)
    }

    async fn fetch(
        &self,
        user_id: UserId,
        client_id: Option<ClientId>,
        range: DateRange,
    ) -> ServiceResult<(Vec<Invoice>, Vec<Expense>)> {
        let invoice_filter = InvoiceFilter {
            status: None,
            client_id,
            issued: range,
        };
        let expense_filter = ExpenseFilter {
            client_id,
            category: None,
            incurred: range,
        };

        let invoices = self.invoices.list(user_id, &invoice_filter).await?;
        let expenses = self.expenses.list(user_id, &expense_filter).await?;
        tracing::debug!(invoices = invoices.len(), expenses = expenses.len(), "report inputs loaded");
        Ok((invoices, expenses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilio_clients::{Client, ClientInput};
    use bilio_expenses::ExpenseInput;
    use bilio_invoicing::{InvoiceStatus, ItemInput, NewInvoice, PaymentInput};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::services::{ClientService, ExpenseService, InvoiceService};
    use crate::store::InMemoryLedgerStore;

    struct Ledger {
        clients: ClientService,
        invoices: InvoiceService,
        expenses: ExpenseService,
        reports: ReportService,
        user: UserId,
    }

    fn ledger() -> Ledger {
        let store = Arc::new(InMemoryLedgerStore::new());
        Ledger {
            clients: ClientService::new(store.clone()),
            invoices: InvoiceService::new(store.clone(), store.clone()),
            expenses: ExpenseService::new(store.clone(), store.clone()),
            reports: ReportService::new(store.clone(), store.clone(), store),
            user: UserId::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    impl Ledger {
        async fn client(&self, name: &str) -> Client {
            let input = ClientInput {
                name: name.to_string(),
                ..ClientInput::default()
            };
            self.clients.create(self.user, input).await.unwrap()
        }

        async fn invoice(&self, client: &Client, number: &str, on: NaiveDate, price: Decimal, status: InvoiceStatus) -> Invoice {
            let input = NewInvoice {
                client_id: client.id,
                invoice_number: number.to_string(),
                status: Some(status),
                issue_date: on,
                due_date: None,
                currency: String::new(),
                tax_rate: dec!(10),
                notes: None,
                items: vec![ItemInput {
                    description: "Work".to_string(),
                    quantity: dec!(1),
                    unit_price: price,
                }],
            };
            self.invoices.create(self.user, input).await.unwrap()
        }

        async fn paid_invoice(&self, client: &Client, number: &str, on: NaiveDate, price: Decimal) -> Invoice {
            let invoice = self.invoice(client, number, on, price, InvoiceStatus::Pending).await;
            let payment = PaymentInput {
                amount: invoice.total(),
                currency: String::new(),
                method: None,
                payment_date: on,
                transaction_id: None,
                notes: None,
            };
            self.invoices.mark_paid(invoice.id, self.user, payment).await.unwrap()
        }

        async fn expense(&self, client: Option<&Client>, description: &str, on: NaiveDate, amount: Decimal) -> Expense {
            let input = ExpenseInput {
                client_id: client.map(|c| c.id),
                description: description.to_string(),
                amount,
                currency: String::new(),
                category: None,
                expense_date: on,
                receipt_url: None,
                notes: None,
            };
            self.expenses.create(self.user, input).await.unwrap()
        }
    }

    #[tokio::test]
    async fn summary_counts_and_sums() {
        let l = ledger();
        let acme = l.client("Acme").await;
        l.paid_invoice(&acme, "INV-1", date(2024, 1, 5), dec!(100)).await;
        l.invoice(&acme, "INV-2", date(2024, 1, 9), dec!(40), InvoiceStatus::Pending).await;
        l.invoice(&acme, "INV-3", date(2024, 1, 12), dec!(60), InvoiceStatus::Overdue).await;
        l.invoice(&acme, "INV-4", date(2024, 1, 15), dec!(70), InvoiceStatus::Draft).await;
        l.expense(None, "Hosting", date(2024, 1, 20), dec!(30)).await;

        let report = l.reports.summary(l.user, DateRange::default()).await.unwrap();
        assert_eq!(report.total_revenue, dec!(110));
        assert_eq!(report.total_expenses, dec!(30));
        assert_eq!(report.net_profit, dec!(80));
        assert_eq!(report.outstanding_invoices, 2);
        assert_eq!(report.paid_invoices, 1);
        assert_eq!(report.total_invoices, 4);
    }

    #[tokio::test]
    async fn summary_respects_range() {
        let l = ledger();
        let acme = l.client("Acme").await;
        l.paid_invoice(&acme, "INV-1", date(2024, 1, 5), dec!(100)).await;
        l.paid_invoice(&acme, "INV-2", date(2024, 3, 5), dec!(200)).await;
        l.expense(None, "Old", date(2023, 12, 31), dec!(5)).await;

        let range = DateRange::between(date(2024, 3, 1), date(2024, 3, 31));
        let report = l.reports.summary(l.user, range).await.unwrap();
        assert_eq!(report.total_revenue, dec!(220));
        assert_eq!(report.total_expenses, Decimal::ZERO);
        assert_eq!(report.total_invoices, 1);
    }

    #[tokio::test]
    async fn profitability_is_scoped_to_client() {
        let l = ledger();
        let acme = l.client("Acme").await;
        let globex = l.client("Globex").await;
        l.paid_invoice(&acme, "INV-1", date(2024, 1, 5), dec!(100)).await;
        l.paid_invoice(&globex, "INV-2", date(2024, 1, 6), dec!(500)).await;
        l.expense(Some(&acme), "Travel", date(2024, 1, 7), dec!(55)).await;
        l.expense(None, "Hosting", date(2024, 1, 8), dec!(20)).await;

        let report = l
            .reports
            .client_profitability(l.user, acme.id, DateRange::default())
            .await
            .unwrap();
        assert_eq!(report.client_name, "Acme");
        assert_eq!(report.total_revenue, dec!(110));
        assert_eq!(report.total_expenses, dec!(55));
        assert_eq!(report.net_profit, dec!(55));
        assert_eq!(report.profit_margin, dec!(50));
    }

    #[tokio::test]
    async fn zero_revenue_margin_is_zero() {
        let l = ledger();
        let acme = l.client("Acme").await;
        l.expense(Some(&acme), "Travel", date(2024, 1, 7), dec!(55)).await;

        let report = l
            .reports
            .client_profitability(l.user, acme.id, DateRange::default())
            .await
            .unwrap();
        assert_eq!(report.total_revenue, Decimal::ZERO);
        assert_eq!(report.net_profit, dec!(-55));
        assert_eq!(report.profit_margin, Decimal::ZERO);
    }

    #[tokio::test]
    async fn profitability_of_unknown_client_is_not_found() {
        let l = ledger();
        let err = l
            .reports
            .client_profitability(l.user, ClientId::new(), DateRange::default())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::not_found("client not found"));
    }

    #[tokio::test]
    async fn tax_summary_lists_paid_invoices_and_expenses() {
        let l = ledger();
        let acme = l.client("Acme").await;
        l.paid_invoice(&acme, "INV-1", date(2024, 1, 5), dec!(100)).await;
        l.invoice(&acme, "INV-2", date(2024, 2, 1), dec!(40), InvoiceStatus::Pending).await;
        l.paid_invoice(&acme, "INV-3", date(2024, 6, 1), dec!(999)).await;
        l.expense(None, "Hosting", date(2024, 2, 10), dec!(30)).await;

        let summary = l
            .reports
            .tax_summary(l.user, date(2024, 1, 1), date(2024, 3, 31))
            .await
            .unwrap();
        assert_eq!(summary.period, "2024-01 to 2024-03");
        assert_eq!(summary.invoices.len(), 1);
        assert_eq!(summary.invoices[0].invoice_number, "INV-1");
        assert_eq!(summary.invoices[0].client_name, "Acme");
        assert_eq!(summary.invoices[0].tax_amount, dec!(10));
        assert_eq!(summary.expenses.len(), 1);
        assert_eq!(summary.expenses[0].category, "");
        assert_eq!(summary.total_revenue, dec!(110));
        assert_eq!(summary.total_expenses, dec!(30));
        assert_eq!(summary.net_income, dec!(80));
    }

    #[tokio::test]
    async fn tax_summary_rejects_inverted_range() {
        let l = ledger();
        let err = l
            .reports
            .tax_summary(l.user, date(2024, 3, 1), date(2024, 1, 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn reports_never_see_other_users() {
        let l = ledger();
        let acme = l.client("Acme").await;
        l.paid_invoice(&acme, "INV-1", date(2024, 1, 5), dec!(100)).await;

        let report = l.reports.summary(UserId::new(), DateRange::default()).await.unwrap();
        assert_eq!(report, SummaryReport::default());
    }
}
