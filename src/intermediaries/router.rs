use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;

use super::service::{AddClientRequest, TiService, TiServiceError};
use super::{TiGroupId, TiRepository};

/// Router builder exposing client management for trusted intermediaries.
pub fn ti_router<T>(service: Arc<TiService<T>>) -> Router
where
    T: TiRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/ti/groups/:group_id/clients",
            get(list_clients_handler::<T>).post(add_client_handler::<T>),
        )
        .with_state(service)
}

pub(crate) async fn add_client_handler<T>(
    State(service): State<Arc<TiService<T>>>,
    Path(group_id): Path<TiGroupId>,
    axum::Json(request): axum::Json<AddClientRequest>,
) -> Response
where
    T: TiRepository + 'static,
{
    match service.add_client(group_id, request) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_clients_handler<T>(
    State(service): State<Arc<TiService<T>>>,
    Path(group_id): Path<TiGroupId>,
) -> Response
where
    T: TiRepository + 'static,
{
    match service.clients(group_id) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: TiServiceError) -> Response {
    let status = match &error {
        TiServiceError::UnknownGroup(_) => StatusCode::NOT_FOUND,
        TiServiceError::DuplicateClientEmail(_) => StatusCode::CONFLICT,
        TiServiceError::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TiServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
