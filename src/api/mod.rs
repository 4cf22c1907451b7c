//! API layer - HTTP handlers and routing
//!
//! JSON endpoints live under `/api/v1`:
//! - Public reads for services, team, stats, method steps, categories, tags and posts
//! - Contact form submission
//! - Admin login/logout
//! - Admin CRUD, split between editorial content (EDITOR) and the rest (SUPER_ADMIN)
//!
//! Server-rendered pages and embedded static assets are served from the root.

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod categories;
pub mod common;
pub mod contacts;
pub mod method_steps;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod responses;
pub mod site;
pub mod static_files;
pub mod stats;
pub mod tags;
pub mod team;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedAdmin};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Editorial content: posts, tags, categories
    let editor_routes = Router::new()
        .nest("/admin/posts", posts::admin_router())
        .nest("/admin/tags", tags::admin_router())
        .nest("/admin/categories", categories::admin_router())
        .nest("/admin", admin::editor_router())
        .route_layer(axum_middleware::from_fn(middleware::require_editor))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Everything else in the back office
    let super_admin_routes = Router::new()
        .nest("/admin/services", catalog::admin_router())
        .nest("/admin/team", team::admin_router())
        .nest("/admin/stats", stats::admin_router())
        .nest("/admin/method-steps", method_steps::admin_router())
        .nest("/admin/contacts", contacts::admin_router())
        .nest("/admin", admin::super_admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_super_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Signed in, any role
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .nest("/site", site::router())
        .nest("/services", catalog::public_router())
        .nest("/team", team::public_router())
        .nest("/stats", stats::public_router())
        .nest("/method-steps", method_steps::public_router())
        .nest("/categories", categories::public_router())
        .nest("/tags", tags::public_router())
        .nest("/posts", posts::public_router())
        .nest("/contact", contacts::public_router())
        .nest("/auth", auth::public_router())
        .merge(editor_routes)
        .merge(super_admin_routes)
        .merge(protected_routes)
}

/// Build the complete application router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    // Cookie auth needs credentials, so the origin must be explicit.
    // An unparsable origin leaves cross-origin requests disabled.
    let origins: Vec<HeaderValue> = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => vec![origin],
        Err(e) => {
            tracing::warn!("Invalid CORS origin {:?}: {}", cors_origin, e);
            Vec::new()
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest("/static", static_files::router())
        .merge(pages::router())
        .fallback(pages::not_found)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::{create_test_pool, migrations::run_migrations};
    use crate::models::AdminRole;

    const PASSWORD: &str = "correct horse battery";

    async fn setup() -> (Router, AppState) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let state = AppState::new(Config::default(), pool).unwrap();
        let app = build_router(state.clone(), "http://localhost:3000");
        (app, state)
    }

    async fn token_for(state: &AppState, email: &str, role: AdminRole) -> String {
        state
            .auth_service
            .create_admin(email, PASSWORD, "Test Admin", role)
            .await
            .unwrap();
        state
            .auth_service
            .login(email, PASSWORD, None)
            .await
            .unwrap()
            .session
            .id
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_public_lists() {
        let (app, _) = setup().await;

        let response = app.clone().oneshot(get("/api/v1/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(!body["stats"].as_array().unwrap().is_empty());

        let response = app.clone().oneshot(get("/api/v1/categories")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["categories"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["slug"] == "ctf"));

        let response = app.oneshot(get("/api/v1/posts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["posts"], json!([]));
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        let (app, _) = setup().await;

        let response = app.clone().oneshot(get("/api/v1/admin/posts")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");

        let response = app.oneshot(get("/api/v1/auth/me")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_editor_cannot_manage_services() {
        let (app, state) = setup().await;
        let token = token_for(&state, "editor@jcpc.fr", AdminRole::Editor).await;

        let request = Request::builder()
            .uri("/api/v1/admin/services")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let request = Request::builder()
            .uri("/api/v1/admin/tags")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_sets_cookie_usable_for_me() {
        let (app, state) = setup().await;
        state
            .auth_service
            .create_admin("boss@jcpc.fr", PASSWORD, "Boss", AdminRole::SuperAdmin)
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({ "email": "Boss@JCPC.fr", "password": PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("jcpc_admin_session="));
        assert!(cookie.contains("HttpOnly"));
        let pair = cookie.split(';').next().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::COOKIE, pair)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["admin"]["email"], "boss@jcpc.fr");
        assert_eq!(body["admin"]["role"], "SUPER_ADMIN");
        assert!(body["admin"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let (app, state) = setup().await;
        state
            .auth_service
            .create_admin("boss@jcpc.fr", PASSWORD, "Boss", AdminRole::SuperAdmin)
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({ "email": "boss@jcpc.fr", "password": "wrong-password-123" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_created_post_is_public_once_published() {
        let (app, state) = setup().await;
        let token = token_for(&state, "editor@jcpc.fr", AdminRole::Editor).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/posts",
                Some(&token),
                json!({
                    "slug": "writeup-404ctf",
                    "title": "Writeup 404CTF",
                    "excerpt": "Nos solutions",
                    "content": "# Pwn\n\nPremier flag",
                    "category": "writeup",
                    "tags": "pwn, web",
                    "published": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["author_name"], "Test Admin");
        assert_eq!(created["tags"], json!(["pwn", "web"]));

        let response = app
            .clone()
            .oneshot(get("/api/v1/posts/writeup-404ctf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["content_html"].as_str().unwrap().contains("<h1"));

        let response = app.oneshot(get("/journal/writeup-404ctf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Writeup 404CTF"));
    }

    #[tokio::test]
    async fn test_contact_validation_lists_fields() {
        let (app, state) = setup().await;

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/contact", None, json!({ "name": "A" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["details"]["fields"].as_array().unwrap().len() > 1);

        let subject = state.config.site.contact_subjects[0].clone();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/contact",
                None,
                json!({
                    "name": "Alice Martin",
                    "company": "ACME",
                    "email": "alice@example.com",
                    "subject": subject,
                    "message": "Nous souhaitons un audit de notre site.",
                    "consent": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(state.contact_service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_uses_error_shape() {
        let (app, _) = setup().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Requête invalide"));

        // Well-formed JSON with a wrongly typed field
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({ "email": 42, "password": true }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .body(Body::from(r#"{"email":"boss@jcpc.fr","password":"correct horse battery"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            body_json(response).await["error"]["code"],
            "UNSUPPORTED_MEDIA_TYPE"
        );
    }

    #[tokio::test]
    async fn test_pages_render() {
        let (app, _) = setup().await;

        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let home = body_text(response).await;
        assert!(home.contains("cosmic.js"));
        assert!(home.contains(r#"id="ctf-platform""#));
        assert!(home.contains("Une plateforme CTF"));
        assert!(home.contains(r#"href="https://ctf.jcpc.fr""#));
        assert!(home.contains(r#"href="/#ctf-platform""#));

        let response = app.clone().oneshot(get("/journal?category=ctf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/mentions-legales")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Non assujetti"));
    }

    #[tokio::test]
    async fn test_unknown_paths() {
        let (app, _) = setup().await;

        let response = app.clone().oneshot(get("/nulle-part")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("404"));

        let response = app.clone().oneshot(get("/journal/absent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/api/v1/nothing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_static_assets() {
        let (app, _) = setup().await;
        let response = app.clone().oneshot(get("/static/css/site.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css; charset=utf-8"
        );

        let response = app.oneshot(get("/static/js/nope.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dashboard_redirects_without_session() {
        let (app, state) = setup().await;

        let response = app.clone().oneshot(get("/admin/dashboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin");

        let token = token_for(&state, "boss@jcpc.fr", AdminRole::SuperAdmin).await;
        let request = Request::builder()
            .uri("/admin/dashboard")
            .header(header::COOKIE, format!("jcpc_admin_session={}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Messages récents"));
    }

    #[tokio::test]
    async fn test_login_form_redirects_to_dashboard() {
        let (app, state) = setup().await;
        state
            .auth_service
            .create_admin("boss@jcpc.fr", PASSWORD, "Boss", AdminRole::SuperAdmin)
            .await
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/admin")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=boss%40jcpc.fr&password=correct+horse+battery"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(header::SET_COOKIE).is_some());

        let request = Request::builder()
            .method("POST")
            .uri("/admin")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=boss%40jcpc.fr&password=not+the+right+one"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("boss@jcpc.fr"));
    }
}
