use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn join(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::WaitlistRequest>,
) -> axum::response::Response {
    match services.waitlist.join(&body.email, &body.promocode).await {
        Ok(outcome) => {
            let status = if outcome.is_created() { StatusCode::CREATED } else { StatusCode::OK };
            (status, Json(dto::WaitlistResponse::from(outcome))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
