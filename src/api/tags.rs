//! Tag API endpoints
//!
//! - GET /api/v1/tags - All tags, by name
//! - GET/POST /api/v1/admin/tags (EDITOR)
//! - GET/PUT/DELETE /api/v1/admin/tags/{id}
//! - POST /api/v1/admin/tags/batch - Create several tags, skipping existing ones

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::CountResponse;
use crate::api::middleware::{ApiError, ApiJson, AppState};
use crate::api::responses::TagsResponse;
use crate::models::{CreateTagInput, Tag, UpdateTagInput};

/// Request body for batch creation
#[derive(Debug, Deserialize)]
pub struct BatchTagsRequest {
    pub names: Vec<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/batch", post(create_batch))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

async fn list(State(state): State<AppState>) -> Result<Json<TagsResponse>, ApiError> {
    let tags = state.tag_service.list().await?;
    Ok(Json(TagsResponse { tags }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateTagInput>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tag_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn create_batch(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BatchTagsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.tag_service.create_many(&body.names).await?;
    Ok((StatusCode::CREATED, Json(CountResponse { count })))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<UpdateTagInput>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.update(id, input).await?))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
