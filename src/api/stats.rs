//! Site statistics API endpoints
//!
//! - GET /api/v1/stats - Key figures shown on the home page
//! - GET/POST /api/v1/admin/stats (SUPER_ADMIN)
//! - GET/PUT/DELETE /api/v1/admin/stats/{id}
//! - PUT /api/v1/admin/stats/key/{key} - Update the value only
//! - POST /api/v1/admin/stats/reorder
//! - POST /api/v1/admin/stats/seed

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{CountResponse, ReorderRequest, SuccessResponse};
use crate::api::middleware::{ApiError, ApiJson, AppState};
use crate::api::responses::StatsResponse;
use crate::models::{SiteStat, SiteStatInput};

#[derive(Debug, Deserialize)]
pub struct UpdateValueRequest {
    pub value: i32,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/reorder", post(reorder))
        .route("/seed", post(seed))
        .route("/key/{key}", put(update_value))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

async fn list(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.stats_service.list().await?;
    Ok(Json(StatsResponse { stats }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SiteStat>, ApiError> {
    Ok(Json(state.stats_service.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SiteStatInput>,
) -> Result<impl IntoResponse, ApiError> {
    let stat = state.stats_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(stat)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<SiteStatInput>,
) -> Result<Json<SiteStat>, ApiError> {
    Ok(Json(state.stats_service.update(id, input).await?))
}

async fn update_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    ApiJson(body): ApiJson<UpdateValueRequest>,
) -> Result<Json<SiteStat>, ApiError> {
    Ok(Json(state.stats_service.update_value(&key, body.value).await?))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.stats_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ReorderRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.stats_service.reorder(&body.ids).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn seed(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.stats_service.seed_defaults().await?;
    Ok(Json(CountResponse { count }))
}
