use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bilio_infra::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let kind = err.kind();
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, kind, msg),
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, kind, msg),
        ServiceError::InvalidState(msg) => json_error(StatusCode::CONFLICT, kind, msg),
        ServiceError::AlreadyUsed(msg) => json_error(StatusCode::CONFLICT, kind, msg),
        ServiceError::Exhausted(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, kind, msg),
        ServiceError::Dependency(msg) => {
            tracing::error!(error = %msg, "dependency failure");
            json_error(StatusCode::BAD_GATEWAY, kind, "an upstream dependency failed")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation", message)
}
