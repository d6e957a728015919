use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::CallerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(caller): Extension<CallerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": caller.user_id().to_string(),
        "email": caller.email(),
    }))
}
