use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bilio_promotions::{WaitlistEntry, normalize_email};

use super::{PromocodeService, ServiceError, ServiceResult};
use crate::notify::{NotificationSender, templates};
use crate::store::{InsertOutcome, WaitlistStore};

/// Promocode-gated waitlist signup.
#[derive(Clone)]
pub struct WaitlistService {
    promocodes: PromocodeService,
    entries: Arc<dyn WaitlistStore>,
    notifier: Arc<dyn NotificationSender>,
    allowed_domain: String,
}

impl WaitlistService {
    pub fn new(
        promocodes: PromocodeService,
        entries: Arc<dyn WaitlistStore>,
        notifier: Arc<dyn NotificationSender>,
        allowed_domain: impl Into<String>,
    ) -> Self {
        Self {
            promocodes,
            entries,
            notifier,
            allowed_domain: allowed_domain.into(),
        }
    }

    /// Join the waitlist.
    ///
    /// Input is fully validated before the code is spent. A re-join with an
    /// already listed address succeeds with the stored entry and sends
    /// nothing. The code is consumed even then.
    #[instrument(skip(self, email, promocode), err)]
    pub async fn join(&self, email: &str, promocode: &str) -> ServiceResult<InsertOutcome<WaitlistEntry>> {
        if promocode.trim().is_empty() {
            return Err(ServiceError::validation("promocode is required"));
        }
        let email = normalize_email(email, &self.allowed_domain)?;

        match self.promocodes.redeem(promocode).await {
            Ok(_) => {}
            Err(ServiceError::NotFound(_)) => return Err(ServiceError::validation("invalid promocode")),
            Err(ServiceError::AlreadyUsed(_)) => {
                return Err(ServiceError::validation("promocode already used"));
            }
            Err(ServiceError::Validation(msg)) => return Err(ServiceError::Validation(msg)),
            Err(other) => return Err(ServiceError::Dependency(other.to_string())),
        }

        let outcome = self
            .entries
            .insert_or_get(&WaitlistEntry::new(email, Utc::now()))
            .await?;

        match &outcome {
            InsertOutcome::Created(entry) => {
                self.notifier.send(&templates::waitlist_welcome(&entry.email)).await?;
                tracing::info!("waitlist entry created");
            }
            InsertOutcome::Existing(_) => {
                tracing::info!("waitlist entry already present");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::templates::WAITLIST_WELCOME_SUBJECT;
    use crate::services::testing::RecordingSender;
    use crate::store::InMemoryLedgerStore;
    use bilio_promotions::DEFAULT_WAITLIST_DOMAIN;

    struct Harness {
        waitlist: WaitlistService,
        promocodes: PromocodeService,
        sender: Arc<RecordingSender>,
    }

    fn harness_with(sender: RecordingSender) -> Harness {
        let store = Arc::new(InMemoryLedgerStore::new());
        let sender = Arc::new(sender);
        let promocodes = PromocodeService::new(store.clone());
        Harness {
            waitlist: WaitlistService::new(
                promocodes.clone(),
                store,
                sender.clone(),
                DEFAULT_WAITLIST_DOMAIN,
            ),
            promocodes,
            sender,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingSender::default())
    }

    #[tokio::test]
    async fn join_creates_entry_and_sends_welcome() {
        let h = harness();
        let code = h.promocodes.generate().await.unwrap().code;

        let outcome = h.waitlist.join(" Jane@Gmail.com ", &code).await.unwrap();
        assert!(outcome.is_created());
        assert_eq!(outcome.into_inner().email, "jane@gmail.com");

        let sent = h.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@gmail.com");
        assert_eq!(sent[0].subject, WAITLIST_WELCOME_SUBJECT);
    }

    #[tokio::test]
    async fn display_name_form_stores_bare_address() {
        let h = harness();
        let code = h.promocodes.generate().await.unwrap().code;

        let outcome = h.waitlist.join("Jane <Jane@Gmail.com>", &code).await.unwrap();
        assert_eq!(outcome.into_inner().email, "jane@gmail.com");
        assert_eq!(h.sender.sent()[0].to, "jane@gmail.com");
    }

    #[tokio::test]
    async fn rejoin_with_other_casing_is_idempotent() {
        let h = harness();
        let first = h.promocodes.generate().await.unwrap().code;
        let second = h.promocodes.generate().await.unwrap().code;

        let created = h.waitlist.join("jane@gmail.com", &first).await.unwrap().into_inner();
        let again = h.waitlist.join("JANE@GMAIL.COM", &second).await.unwrap();

        assert!(!again.is_created());
        assert_eq!(again.into_inner(), created);
        assert_eq!(h.sender.sent().len(), 1);
        assert_eq!(h.promocodes.redeem(&second).await.unwrap_err().kind(), "already_used");
    }

    #[tokio::test]
    async fn bad_input_leaves_code_unspent() {
        let h = harness();
        let code = h.promocodes.generate().await.unwrap().code;

        assert_eq!(
            h.waitlist.join("jane@gmail.com", "  ").await.unwrap_err(),
            ServiceError::validation("promocode is required")
        );
        assert_eq!(
            h.waitlist.join("jane@outlook.com", &code).await.unwrap_err().kind(),
            "validation"
        );
        assert_eq!(
            h.waitlist.join("not an email", &code).await.unwrap_err().kind(),
            "validation"
        );

        assert!(h.waitlist.join("jane@gmail.com", &code).await.unwrap().is_created());
    }

    #[tokio::test]
    async fn promocode_failures_become_validation() {
        let h = harness();
        assert_eq!(
            h.waitlist.join("jane@gmail.com", "FFFFFFFF").await.unwrap_err(),
            ServiceError::validation("invalid promocode")
        );

        let code = h.promocodes.generate().await.unwrap().code;
        h.promocodes.redeem(&code).await.unwrap();
        assert_eq!(
            h.waitlist.join("jane@gmail.com", &code).await.unwrap_err(),
            ServiceError::validation("promocode already used")
        );
        assert!(h.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_dependency_but_entry_stays() {
        let h = harness_with(RecordingSender::failing());
        let code = h.promocodes.generate().await.unwrap().code;

        let err = h.waitlist.join("jane@gmail.com", &code).await.unwrap_err();
        assert_eq!(err.kind(), "dependency");

        let next = h.promocodes.generate().await.unwrap().code;
        let outcome = h.waitlist.join("jane@gmail.com", &next).await.unwrap();
        assert!(!outcome.is_created());
    }
}
