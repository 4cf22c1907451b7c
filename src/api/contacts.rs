//! Contact message API endpoints
//!
//! - POST /api/v1/contact - Public contact form
//! - GET /api/v1/admin/contacts (SUPER_ADMIN) - Newest first
//! - POST /api/v1/admin/contacts/{id}/read
//! - DELETE /api/v1/admin/contacts/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::api::common::SuccessResponse;
use crate::api::middleware::{ApiError, ApiJson, AppState};
use crate::api::responses::ContactsResponse;
use crate::models::ContactInput;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", post(submit))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", delete(remove))
        .route("/{id}/read", post(mark_as_read))
}

async fn submit(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ContactInput>,
) -> Result<impl IntoResponse, ApiError> {
    state.contact_service.submit(input).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::ok())))
}

async fn list(State(state): State<AppState>) -> Result<Json<ContactsResponse>, ApiError> {
    let contacts = state.contact_service.list().await?;
    Ok(Json(ContactsResponse { contacts }))
}

async fn mark_as_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.contact_service.mark_as_read(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.contact_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
