//! Journal post API endpoints
//!
//! Public:
//! - GET /api/v1/posts?category= - Published posts, featured first
//! - GET /api/v1/posts/{slug} - Published post with rendered body
//!
//! Admin (EDITOR):
//! - GET/POST /api/v1/admin/posts
//! - GET/PUT/DELETE /api/v1/admin/posts/{id}
//! - POST /api/v1/admin/posts/{id}/toggle-publish

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedAdmin};
use crate::api::responses::{PostResponse, PostsResponse};
use crate::models::PostInput;
use crate::services::parse_tags;

/// Query parameters for the public list
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub category: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published))
        .route("/{slug}", get(get_published))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/toggle-publish", post(toggle_publish))
}

/// Decode an editor payload. `tags` may be a list or a comma-separated string.
pub fn post_input(mut body: serde_json::Value) -> Result<PostInput, ApiError> {
    if let Some(tags) = body.get("tags").and_then(|t| t.as_str()).map(parse_tags) {
        body["tags"] = serde_json::json!(tags);
    }
    serde_json::from_value(body)
        .map_err(|e| ApiError::validation_error(format!("Requête invalide: {}", e)))
}

async fn list_published(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostsResponse>, ApiError> {
    let posts = state
        .post_service
        .list_published(query.category.as_deref())
        .await?;
    Ok(Json(PostsResponse { posts }))
}

async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Article introuvable"))?;
    Ok(Json(PostResponse::render(post, &state.markdown)))
}

async fn list_all(State(state): State<AppState>) -> Result<Json<PostsResponse>, ApiError> {
    let posts = state.post_service.list_all().await?;
    Ok(Json(PostsResponse { posts }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get(id).await?;
    Ok(Json(PostResponse::render(post, &state.markdown)))
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let input = post_input(body)?;
    let post = state.post_service.create(input, &admin).await?;
    tracing::info!("Post {} created by admin {}", post.slug, admin.id);
    Ok((StatusCode::CREATED, Json(PostResponse::render(post, &state.markdown))))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<PostResponse>, ApiError> {
    let input = post_input(body)?;
    let post = state.post_service.update(id, input).await?;
    Ok(Json(PostResponse::render(post, &state.markdown)))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.toggle_publish(id).await?;
    Ok(Json(PostResponse::render(post, &state.markdown)))
}
