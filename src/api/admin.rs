//! Admin API endpoints
//!
//! - GET /api/v1/admin/dashboard - Counters and latest activity
//! - POST /api/v1/admin/preview - Render markdown as the journal would (EDITOR)
//! - POST /api/v1/admin/cache/clear - Drop every cached read (SUPER_ADMIN)

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::SuccessResponse;
use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedAdmin};
use crate::cache::CacheLayer;
use crate::services::DashboardSummary;

/// Request for rendering markdown content
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub content: String,
}

/// Response for rendered content
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub html: String,
}

/// Routes open to every signed-in admin
pub fn editor_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/preview", post(preview))
}

/// Routes reserved to super admins
pub fn super_admin_router() -> Router<AppState> {
    Router::new().route("/cache/clear", post(clear_cache))
}

/// Dashboard overview for `admin`. Editors do not see contact messages.
pub async fn summary_for(state: &AppState, admin: &crate::models::Admin) -> Result<DashboardSummary, ApiError> {
    let mut summary = state.dashboard_service.summary().await?;
    if !admin.is_super_admin() {
        summary.recent_contacts.clear();
    }
    Ok(summary)
}

async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
) -> Result<Json<DashboardSummary>, ApiError> {
    Ok(Json(summary_for(&state, &admin).await?))
}

async fn preview(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PreviewRequest>,
) -> Json<PreviewResponse> {
    Json(PreviewResponse {
        html: state.markdown.render(&body.content),
    })
}

async fn clear_cache(
    State(state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.cache.clear().await?;
    tracing::info!("Cache cleared by admin {}", admin.id);
    Ok(Json(SuccessResponse::ok()))
}
