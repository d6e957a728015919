use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn generate(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.promocodes.generate().await {
        Ok(promo) => (StatusCode::CREATED, Json(dto::PromocodeResponse::from(promo))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
