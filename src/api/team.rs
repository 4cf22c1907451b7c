//! Team API endpoints
//!
//! - GET /api/v1/team - Active members
//! - GET/POST /api/v1/admin/team (SUPER_ADMIN)
//! - GET/PUT/DELETE /api/v1/admin/team/{id}
//! - POST /api/v1/admin/team/{id}/toggle
//! - POST /api/v1/admin/team/reorder

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::{ReorderRequest, SuccessResponse};
use crate::api::middleware::{ApiError, ApiJson, AppState};
use crate::api::responses::TeamResponse;
use crate::models::{TeamMember, TeamMemberInput};

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

async fn list_active(State(state): State<AppState>) -> Result<Json<TeamResponse>, ApiError> {
    let members = state.team_service.list(false).await?;
    Ok(Json(TeamResponse { members }))
}

async fn list_all(State(state): State<AppState>) -> Result<Json<TeamResponse>, ApiError> {
    let members = state.team_service.list(true).await?;
    Ok(Json(TeamResponse { members }))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TeamMember>, ApiError> {
    Ok(Json(state.team_service.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TeamMemberInput>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.team_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<TeamMemberInput>,
) -> Result<Json<TeamMember>, ApiError> {
    Ok(Json(state.team_service.update(id, input).await?))
}

async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.team_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TeamMember>, ApiError> {
    Ok(Json(state.team_service.toggle_active(id).await?))
}

async fn reorder(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ReorderRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.team_service.reorder(&body.ids).await?;
    Ok(Json(SuccessResponse::ok()))
}
