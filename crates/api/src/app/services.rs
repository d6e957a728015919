use std::sync::Arc;

use thiserror::Error;

use bilio_infra::notify::{LogSender, NotificationSender, NotifyError, SmtpSender};
use bilio_infra::services::{
    ClientService, ExpenseService, InvoiceService, PromocodeService, ReportService, WaitlistService,
};
use bilio_infra::store::{
    ClientStore, ExpenseStore, InMemoryLedgerStore, InvoiceStore, PgLedgerStore, PromocodeStore,
    StoreError, WaitlistStore,
};

use crate::config::AppConfig;

const PG_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("notifications: {0}")]
    Notify(#[from] NotifyError),
}

/// Engines shared by every handler; built once at start-up.
#[derive(Clone)]
pub struct AppServices {
    pub clients: ClientService,
    pub invoices: InvoiceService,
    pub expenses: ExpenseService,
    pub reports: ReportService,
    pub promocodes: PromocodeService,
    pub waitlist: WaitlistService,
}

impl AppServices {
    /// Wire every engine to one store implementing all ledger traits.
    pub fn with_store<S>(store: Arc<S>, notifier: Arc<dyn NotificationSender>, waitlist_domain: &str) -> Self
    where
        S: ClientStore + InvoiceStore + ExpenseStore + PromocodeStore + WaitlistStore + 'static,
    {
        let promocodes = PromocodeService::new(store.clone());
        Self {
            clients: ClientService::new(store.clone()),
            invoices: InvoiceService::new(store.clone(), store.clone()),
            expenses: ExpenseService::new(store.clone(), store.clone()),
            reports: ReportService::new(store.clone(), store.clone(), store.clone()),
            waitlist: WaitlistService::new(promocodes.clone(), store, notifier, waitlist_domain),
            promocodes,
        }
    }

    pub fn in_memory(notifier: Arc<dyn NotificationSender>, waitlist_domain: &str) -> Self {
        Self::with_store(Arc::new(InMemoryLedgerStore::new()), notifier, waitlist_domain)
    }

    /// Postgres when `DATABASE_URL` is set, else in-memory; SMTP when
    /// credentials are configured, else log-only notifications (config
    /// loading only allows that in development).
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let notifier: Arc<dyn NotificationSender> = match &config.smtp {
            Some(settings) => {
                tracing::info!(host = %settings.host, port = settings.port, "smtp notifications enabled");
                Arc::new(SmtpSender::new(settings)?)
            }
            None => {
                tracing::warn!(env = %config.env, "smtp not configured; notifications will only be logged");
                Arc::new(LogSender)
            }
        };

        match &config.database_url {
            Some(url) => {
                let store = PgLedgerStore::connect(url, PG_MAX_CONNECTIONS).await?;
                store.ensure_schema().await?;
                tracing::info!("using postgres ledger store");
                Ok(Self::with_store(Arc::new(store), notifier, &config.waitlist_domain))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; ledger kept in memory");
                Ok(Self::in_memory(notifier, &config.waitlist_domain))
            }
        }
    }
}
