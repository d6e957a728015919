use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use bilio_core::InvoiceId;
use bilio_invoicing::{InvoicePatch, NewInvoice, PaymentInput};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/:id", get(get_invoice).put(update_invoice))
        .route("/:id/pay", post(mark_invoice_paid))
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<NewInvoice>,
) -> axum::response::Response {
    match services.invoices.create(caller.user_id(), body).await {
        Ok(invoice) => (StatusCode::CREATED, Json(invoice)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let filter = match query.invoice_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.invoices.list(caller.user_id(), &filter).await {
        Ok(invoices) => Json(invoices).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: InvoiceId = match dto::parse_id(&id, "invoice id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.invoices.get(id, caller.user_id()).await {
        Ok(invoice) => Json(invoice).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<InvoicePatch>,
) -> axum::response::Response {
    let id: InvoiceId = match dto::parse_id(&id, "invoice id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.invoices.update(id, caller.user_id(), body).await {
        Ok(invoice) => Json(invoice).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn mark_invoice_paid(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<PaymentInput>,
) -> axum::response::Response {
    let id: InvoiceId = match dto::parse_id(&id, "invoice id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.invoices.mark_paid(id, caller.user_id(), body).await {
        Ok(invoice) => Json(invoice).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
