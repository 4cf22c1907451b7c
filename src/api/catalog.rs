//! Service offering API endpoints
//!
//! - GET /api/v1/services - Active services, in display order
//! - GET/POST /api/v1/admin/services (SUPER_ADMIN)
//! - GET/PUT/DELETE /api/v1/admin/services/{id}
//! - POST /api/v1/admin/services/{id}/toggle
//! - POST /api/v1/admin/services/reorder

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::{ReorderRequest, SuccessResponse};
use crate::api::middleware::{ApiError, ApiJson, AppState};
use crate::api::responses::ServicesResponse;
use crate::models::{Service, ServiceInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_active))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all).post(create))
        .route("/reorder", post(reorder))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/toggle", post(toggle))
}

async fn list_active(State(state): State<AppState>) -> Result<Json<ServicesResponse>, ApiError> {
    let services = state.catalog_service.list(false).await?;
    Ok(Json(ServicesResponse { services }))
}

async fn list_all(State(state): State<AppState>) -> Result<Json<ServicesResponse>, ApiError> {
    let services = state.catalog_service.list(true).await?;
    Ok(Json(ServicesResponse { services }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.catalog_service.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ServiceInput>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.catalog_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<ServiceInput>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.catalog_service.update(id, input).await?))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.catalog_service.toggle_active(id).await?))
}

async fn reorder(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ReorderRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.catalog_service.reorder(&body.ids).await?;
    Ok(Json(SuccessResponse::ok()))
}
