//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: engine and store wiring (`AppServices`)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: query parsing and response shapes
//! - `errors.rs`: consistent error responses

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    routing::get,
    BoxError, Extension, Router,
};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

pub const API_PREFIX: &str = "/api/v1";

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>, jwt_secret: &str, request_timeout: Duration) -> Router {
    let jwt = Arc::new(bilio_auth::Hs256JwtValidator::new(jwt_secret.as_bytes().to_vec()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    let api = protected.merge(routes::public_router());

    Router::new()
        .route("/health", get(routes::system::health))
        .nest(API_PREFIX, api)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
}

async fn handle_timeout(err: BoxError) -> axum::response::Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        errors::json_error(StatusCode::GATEWAY_TIMEOUT, "timeout", "request timed out")
    } else {
        tracing::error!(error = %err, "unhandled middleware error");
        errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
    }
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    tracing::error!(panic = %detail, "handler panicked");
    errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
}
