//! Method step API endpoints
//!
//! - GET /api/v1/method-steps - Active steps, in order
//! - GET/POST /api/v1/admin/method-steps (SUPER_ADMIN)
//! - GET/PUT/DELETE /api/v1/admin/method-steps/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, AppState};
use crate::api::responses::MethodStepsResponse;
use crate::models::{MethodStep, MethodStepInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_public))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

async fn list_public(State(state): State<AppState>) -> Result<Json<MethodStepsResponse>, ApiError> {
    let steps = state.method_step_service.list_public().await?;
    Ok(Json(MethodStepsResponse { steps }))
}

async fn list_all(State(state): State<AppState>) -> Result<Json<MethodStepsResponse>, ApiError> {
    let steps = state.method_step_service.list_all().await?;
    Ok(Json(MethodStepsResponse { steps }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MethodStep>, ApiError> {
    Ok(Json(state.method_step_service.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<MethodStepInput>,
) -> Result<impl IntoResponse, ApiError> {
    let step = state.method_step_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(step)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<MethodStepInput>,
) -> Result<Json<MethodStep>, ApiError> {
    Ok(Json(state.method_step_service.update(id, input).await?))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.method_step_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
