use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/client-profit", get(client_profit))
        .route("/tax-summary", get(tax_summary))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let range = match query.range() {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.reports.summary(caller.user_id(), range).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn client_profit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let client_id = match query.client_id() {
        Ok(Some(id)) => id,
        Ok(None) => return errors::bad_request("client_id is required"),
        Err(resp) => return resp,
    };
    let range = match query.range() {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.reports.client_profitability(caller.user_id(), client_id, range).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn tax_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let (from, to) = match query.range() {
        Ok(range) => match (range.from, range.to) {
            (Some(from), Some(to)) => (from, to),
            _ => return errors::bad_request("from_date and to_date are required"),
        },
        Err(resp) => return resp,
    };

    match services.reports.tax_summary(caller.user_id(), from, to).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
