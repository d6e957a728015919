use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bilio_promotions::{CODE_ATTEMPTS, Promocode, generate_code, normalize_code};

use super::{ServiceError, ServiceResult};
use crate::store::{PromocodeStore, StoreError};

/// Single-use code issuance and redemption.
#[derive(Clone)]
pub struct PromocodeService {
    codes: Arc<dyn PromocodeStore>,
    generator: fn() -> String,
}

impl PromocodeService {
    pub fn new(codes: Arc<dyn PromocodeStore>) -> Self {
        Self::with_generator(codes, generate_code)
    }

    pub fn with_generator(codes: Arc<dyn PromocodeStore>, generator: fn() -> String) -> Self {
        Self { codes, generator }
    }

    /// Issue a fresh code, retrying collisions up to [`CODE_ATTEMPTS`] times.
    #[instrument(skip(self), err)]
    pub async fn generate(&self) -> ServiceResult<Promocode> {
        for attempt in 1..=CODE_ATTEMPTS {
            let promo = Promocode::issue((self.generator)(), Utc::now());
            match self.codes.insert(&promo).await {
                Ok(()) => {
                    tracing::info!(attempt, "promocode issued");
                    return Ok(promo);
                }
                Err(StoreError::Duplicate) => {
                    tracing::debug!(attempt, "promocode collision, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        tracing::warn!(attempts = CODE_ATTEMPTS, "promocode generation exhausted");
        Err(ServiceError::Exhausted(format!(
            "could not generate a unique promocode after {CODE_ATTEMPTS} attempts"
        )))
    }

    /// Atomically consume a code. At most one caller ever succeeds per code.
    #[instrument(skip(self, raw), err)]
    pub async fn redeem(&self, raw: &str) -> ServiceResult<Promocode> {
        let code = normalize_code(raw)?;
        match self.codes.find_and_mark_used(&code, Utc::now()).await {
            Ok(promo) => {
                tracing::info!("promocode redeemed");
                Ok(promo)
            }
            Err(StoreError::NotFound) => Err(ServiceError::not_found("promocode not found")),
            Err(StoreError::AlreadyUsed) => Err(ServiceError::AlreadyUsed("promocode already used".to_string())),
            Err(other) => Err(other.into()),
        }
    }
}
