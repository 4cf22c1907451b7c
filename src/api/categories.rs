//! Article category API endpoints
//!
//! - GET /api/v1/categories - Categories in display order
//! - GET/POST /api/v1/admin/categories (EDITOR)
//! - GET/PUT/DELETE /api/v1/admin/categories/{id}
//! - POST /api/v1/admin/categories/reorder
//! - POST /api/v1/admin/categories/seed - Insert the missing default categories

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::{CountResponse, ReorderRequest, SuccessResponse};
use crate::api::middleware::{ApiError, ApiJson, AppState};
use crate::api::responses::CategoriesResponse;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/reorder", post(reorder))
        .route("/seed", post(seed))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

async fn list(State(state): State<AppState>) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state.category_service.list().await?;
    Ok(Json(CategoriesResponse { categories }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<UpdateCategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, input).await?))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ReorderRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.category_service.reorder(&body.ids).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn seed(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.category_service.seed_defaults().await?;
    Ok(Json(CountResponse { count }))
}
