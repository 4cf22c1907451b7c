//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type returned by every endpoint
//! - The JSON body extractor that rejects with that error type
//! - Authentication (session token from Bearer header or cookie)
//! - Authorization (EDITOR and SUPER_ADMIN gates)

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{create_cache, Cache};
use crate::config::{Config, SessionConfig};
use crate::db::repositories::{
    SqlxAdminRepository, SqlxCategoryRepository, SqlxContactRepository,
    SqlxMethodStepRepository, SqlxPostRepository, SqlxServiceRepository,
    SqlxSessionRepository, SqlxSiteStatRepository, SqlxTagRepository,
    SqlxTeamMemberRepository,
};
use crate::db::DynDatabasePool;
use crate::models::Admin;
use crate::services::{
    AuthError, AuthService, CatalogService, CatalogServiceError, CategoryService,
    CategoryServiceError, ContactService, ContactServiceError, DashboardService, EmailService,
    LoginRateLimiter, MarkdownRenderer, MethodStepService, MethodStepServiceError, PostService,
    PostServiceError, StatsService, StatsServiceError, TagService, TagServiceError, TeamService,
    TeamServiceError,
};
use crate::theme::ThemeEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: DynDatabasePool,
    pub cache: Arc<Cache>,
    pub auth_service: Arc<AuthService>,
    pub post_service: Arc<PostService>,
    pub category_service: Arc<CategoryService>,
    pub catalog_service: Arc<CatalogService>,
    pub team_service: Arc<TeamService>,
    pub tag_service: Arc<TagService>,
    pub stats_service: Arc<StatsService>,
    pub method_step_service: Arc<MethodStepService>,
    pub contact_service: Arc<ContactService>,
    pub dashboard_service: Arc<DashboardService>,
    pub markdown: MarkdownRenderer,
    pub theme_engine: Arc<ThemeEngine>,
}

impl AppState {
    /// Wire repositories, cache and services over an already migrated pool
    pub fn new(config: Config, pool: DynDatabasePool) -> anyhow::Result<Self> {
        let cache = create_cache(&config.cache)?;
        let ttl = Duration::from_secs(config.cache.ttl_seconds);

        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let contact_repo = SqlxContactRepository::boxed(pool.clone());

        let auth_service = AuthService::new(
            SqlxAdminRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            LoginRateLimiter::new(),
            config.session.ttl_days,
        );
        let post_service =
            PostService::with_cache_ttl(post_repo.clone(), category_repo.clone(), cache.clone(), ttl);
        let category_service =
            CategoryService::with_cache_ttl(category_repo, post_repo.clone(), cache.clone(), ttl);
        let catalog_service =
            CatalogService::with_cache_ttl(SqlxServiceRepository::boxed(pool.clone()), cache.clone(), ttl);
        let team_service =
            TeamService::with_cache_ttl(SqlxTeamMemberRepository::boxed(pool.clone()), cache.clone(), ttl);
        let tag_service =
            TagService::with_cache_ttl(SqlxTagRepository::boxed(pool.clone()), cache.clone(), ttl);
        let stats_service =
            StatsService::with_cache_ttl(SqlxSiteStatRepository::boxed(pool.clone()), cache.clone(), ttl);
        let method_step_service = MethodStepService::with_cache_ttl(
            SqlxMethodStepRepository::boxed(pool.clone()),
            cache.clone(),
            ttl,
        );
        let contact_service = ContactService::new(
            contact_repo.clone(),
            EmailService::new(config.mail.clone(), &config.site),
            config.site.contact_subjects.clone(),
        );
        let dashboard_service = DashboardService::new(post_repo, contact_repo);

        Ok(Self {
            config: Arc::new(config),
            pool,
            cache,
            auth_service: Arc::new(auth_service),
            post_service: Arc::new(post_service),
            category_service: Arc::new(category_service),
            catalog_service: Arc::new(catalog_service),
            team_service: Arc::new(team_service),
            tag_service: Arc::new(tag_service),
            stats_service: Arc::new(stats_service),
            method_step_service: Arc::new(method_step_service),
            contact_service: Arc::new(contact_service),
            dashboard_service: Arc::new(dashboard_service),
            markdown: MarkdownRenderer::new(),
            theme_engine: Arc::new(ThemeEngine::new()?),
        })
    }
}

/// Authenticated admin, inserted into request extensions by `require_auth`
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub Admin);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedAdmin>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))
    }
}

const NOT_AUTHENTICATED: &str = "Non authentifié";
const NOT_AUTHORIZED: &str = "Accès non autorisé";
const INTERNAL_MESSAGE: &str = "Une erreur interne est survenue";

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new("UNSUPPORTED_MEDIA_TYPE", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the cause and hide it from the client
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::internal_error(INTERNAL_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "UNSUPPORTED_MEDIA_TYPE" => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(format!("{:#}", e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                Self::unsupported_media_type("Le corps doit être du JSON (Content-Type: application/json)")
            }
            other => Self::validation_error(format!("Requête invalide: {}", other.body_text())),
        }
    }
}

/// `Json` extractor whose rejections use the API error shape
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::ValidationError(msg) => Self::validation_error(msg),
            AuthError::InvalidCredentials => Self::unauthorized(e.to_string()),
            AuthError::RateLimited => Self::rate_limited(e.to_string()),
            AuthError::AdminExists => Self::conflict(e.to_string()),
            AuthError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) => Self::not_found(e.to_string()),
            PostServiceError::ValidationError(msg) => Self::validation_error(msg),
            PostServiceError::DuplicateSlug(msg) => Self::conflict(msg),
            PostServiceError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => Self::not_found(e.to_string()),
            CategoryServiceError::DuplicateSlug(_) => Self::conflict(e.to_string()),
            CategoryServiceError::InUse(msg) => Self::conflict(msg),
            CategoryServiceError::ValidationError(msg) => Self::validation_error(msg),
            CategoryServiceError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<CatalogServiceError> for ApiError {
    fn from(e: CatalogServiceError) -> Self {
        match e {
            CatalogServiceError::NotFound(_) => Self::not_found(e.to_string()),
            CatalogServiceError::ValidationError(msg) => Self::validation_error(msg),
            CatalogServiceError::DuplicateSlug(_) => Self::conflict(e.to_string()),
            CatalogServiceError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<TeamServiceError> for ApiError {
    fn from(e: TeamServiceError) -> Self {
        match e {
            TeamServiceError::NotFound(_) => Self::not_found(e.to_string()),
            TeamServiceError::ValidationError(msg) => Self::validation_error(msg),
            TeamServiceError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(_) => Self::not_found(e.to_string()),
            TagServiceError::ValidationError(msg) => Self::validation_error(msg),
            TagServiceError::Conflict(msg) => Self::conflict(msg),
            TagServiceError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<StatsServiceError> for ApiError {
    fn from(e: StatsServiceError) -> Self {
        match e {
            StatsServiceError::NotFound(_) => Self::not_found(e.to_string()),
            StatsServiceError::ValidationError(msg) => Self::validation_error(msg),
            StatsServiceError::DuplicateKey(_) => Self::conflict(e.to_string()),
            StatsServiceError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<MethodStepServiceError> for ApiError {
    fn from(e: MethodStepServiceError) -> Self {
        match e {
            MethodStepServiceError::NotFound(_) => Self::not_found(e.to_string()),
            MethodStepServiceError::ValidationError(msg) => Self::validation_error(msg),
            MethodStepServiceError::InternalError(inner) => inner.into(),
        }
    }
}

impl From<ContactServiceError> for ApiError {
    fn from(e: ContactServiceError) -> Self {
        match e {
            ContactServiceError::NotFound(_) => Self::not_found(e.to_string()),
            ContactServiceError::ValidationError(ref fields) => Self::with_details(
                "VALIDATION_ERROR",
                e.to_string(),
                serde_json::json!({ "fields": fields }),
            ),
            ContactServiceError::InternalError(inner) => inner.into(),
        }
    }
}

/// Extract the session token: Bearer header first, then the session cookie
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some((name, value)) = cookie.trim().split_once('=') {
                    if name == cookie_name && !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    None
}

/// `Set-Cookie` value opening a session
pub fn session_cookie(config: &SessionConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name,
        token,
        config.max_age_seconds()
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", config.cookie_name);
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Resolve the admin behind the request's session, if any
pub async fn current_admin(state: &AppState, headers: &HeaderMap) -> Result<Option<Admin>, ApiError> {
    let Some(token) = extract_session_token(headers, &state.config.session.cookie_name) else {
        return Ok(None);
    };
    Ok(state.auth_service.validate_session(&token).await?)
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let admin = current_admin(&state, request.headers())
        .await?
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?;

    request.extensions_mut().insert(AuthenticatedAdmin(admin));
    Ok(next.run(request).await)
}

/// Editorial content gate (posts, tags, categories)
pub async fn require_editor(request: Request, next: Next) -> Result<Response, ApiError> {
    let admin = request
        .extensions()
        .get::<AuthenticatedAdmin>()
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?;

    if !admin.0.is_editor() {
        return Err(ApiError::forbidden(NOT_AUTHORIZED));
    }

    Ok(next.run(request).await)
}

/// Gate for every other management area
pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let admin = request
        .extensions()
        .get::<AuthenticatedAdmin>()
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?;

    if !admin.0.is_super_admin() {
        tracing::warn!("Admin {} denied access to {}", admin.0.id, request.uri().path());
        return Err(ApiError::forbidden(NOT_AUTHORIZED));
    }

    Ok(next.run(request).await)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::models::AdminRole;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = AdminRole> {
        prop_oneof![Just(AdminRole::SuperAdmin), Just(AdminRole::Editor)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn every_role_may_edit_content(role in role_strategy()) {
            let admin = Admin::new("a@jcpc.fr".to_string(), "hash".to_string(), "A".to_string(), role);
            prop_assert!(admin.is_editor());
        }

        #[test]
        fn only_super_admin_manages_site(role in role_strategy()) {
            let admin = Admin::new("a@jcpc.fr".to_string(), "hash".to_string(), "A".to_string(), role);
            prop_assert_eq!(admin.is_super_admin(), role == AdminRole::SuperAdmin);
        }

        #[test]
        fn cookie_token_round_trips(token in "[a-f0-9]{64}") {
            let mut h = HeaderMap::new();
            h.insert(header::COOKIE, format!("other=1; jcpc_admin_session={}", token).parse().unwrap());
            prop_assert_eq!(extract_session_token(&h, "jcpc_admin_session"), Some(token));
        }
    }
}
