use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use bilio_clients::ClientInput;
use bilio_core::ClientId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/:id", get(get_client).put(update_client).delete(delete_client))
}

pub async fn list_clients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.clients.list(caller.user_id()).await {
        Ok(clients) => Json(clients).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<ClientInput>,
) -> axum::response::Response {
    match services.clients.create(caller.user_id(), body).await {
        Ok(client) => (StatusCode::CREATED, Json(client)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ClientId = match dto::parse_id(&id, "client id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.clients.get(id, caller.user_id()).await {
        Ok(client) => Json(client).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<ClientInput>,
) -> axum::response::Response {
    let id: ClientId = match dto::parse_id(&id, "client id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.clients.update(id, caller.user_id(), body).await {
        Ok(client) => Json(client).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ClientId = match dto::parse_id(&id, "client id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.clients.delete(id, caller.user_id()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
