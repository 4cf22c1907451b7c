//! Authentication API endpoints
//!
//! - POST /api/v1/auth/login - Admin login
//! - POST /api/v1/auth/logout - Admin logout
//! - GET /api/v1/auth/me - Current admin

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::common::{ClientIp, SuccessResponse};
use crate::api::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, ApiError, ApiJson, AppState,
    AuthenticatedAdmin,
};
use crate::models::Admin;

/// Request body for admin login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub admin: Admin,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub admin: Admin,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .auth_service
        .login(&body.email, &body.password, client_ip)
        .await?;

    let cookie = session_cookie(&state.config.session, &outcome.session.id);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            admin: outcome.admin,
            token: outcome.session.id,
            expires_at: outcome.session.expires_at,
        }),
    ))
}

/// POST /api/v1/auth/logout
///
/// Always clears the cookie, even when the session is already gone.
async fn logout(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&request_headers, &state.config.session.cookie_name) {
        state.auth_service.logout(&token).await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&clear_session_cookie(&state.config.session))
            .map_err(ApiError::internal)?,
    );

    Ok((headers, Json(SuccessResponse::ok())))
}

/// GET /api/v1/auth/me
async fn me(AuthenticatedAdmin(admin): AuthenticatedAdmin) -> Json<MeResponse> {
    Json(MeResponse { admin })
}
