use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use bilio_core::ExpenseId;
use bilio_expenses::ExpenseInput;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/:id", get(get_expense).put(update_expense))
}

pub async fn create_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<ExpenseInput>,
) -> axum::response::Response {
    match services.expenses.create(caller.user_id(), body).await {
        Ok(expense) => (StatusCode::CREATED, Json(expense)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_expenses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let filter = match query.expense_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.expenses.list(caller.user_id(), &filter).await {
        Ok(expenses) => Json(expenses).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ExpenseId = match dto::parse_id(&id, "expense id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.expenses.get(id, caller.user_id()).await {
        Ok(expense) => Json(expense).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_expense(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<ExpenseInput>,
) -> axum::response::Response {
    let id: ExpenseId = match dto::parse_id(&id, "expense id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.expenses.update(id, caller.user_id(), body).await {
        Ok(expense) => Json(expense).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
