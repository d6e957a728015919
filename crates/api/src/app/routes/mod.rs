use axum::{
    routing::{get, post},
    Router,
};

pub mod clients;
pub mod expenses;
pub mod invoices;
pub mod promocodes;
pub mod reports;
pub mod system;
pub mod waitlist;

/// Router for all authenticated (user-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/clients", clients::router())
        .nest("/invoices", invoices::router())
        .nest("/expenses", expenses::router())
        .nest("/reports", reports::router())
}

/// Unauthenticated endpoints.
pub fn public_router() -> Router {
    Router::new()
        .route("/promocode", post(promocodes::generate))
        .route("/waitlist", post(waitlist::join))
}
