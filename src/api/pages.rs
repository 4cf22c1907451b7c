//! Server-rendered HTML pages
//!
//! Public site:
//! - GET / - Home (hero, services, method, stats, latest posts, team, contact)
//! - GET /journal?category= - Journal listing
//! - GET /journal/{slug} - Single post
//! - GET /mentions-legales - Legal notices
//! - POST /contact - Contact form, redisplays the home page with the outcome
//!
//! Admin:
//! - GET/POST /admin - Login form
//! - GET /admin/dashboard - Overview, requires a session
//! - POST /admin/logout
//!
//! Unknown paths render the 404 page.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tera::Context as TeraContext;

use crate::api::admin::summary_for;
use crate::api::common::ClientIp;
use crate::api::middleware::{
    clear_session_cookie, current_admin, extract_session_token, session_cookie, ApiError,
    AppState,
};
use crate::models::{Category, ContactInput, Post};
use crate::services::{ContactServiceError, HOME_LATEST_POSTS};
use crate::theme::{format_date_fr, StandardTemplateVars};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/journal", get(journal))
        .route("/journal/{slug}", get(post_page))
        .route("/mentions-legales", get(legal))
        .route("/contact", post(contact_submit))
        .route("/admin", get(login_page).post(login_submit))
        .route("/admin/dashboard", get(dashboard_page))
        .route("/admin/logout", post(logout_submit))
}

/// Post as shown on cards and on its own page
#[derive(Debug, Serialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: Post,
    pub category_label: String,
    pub category_color: String,
    pub difficulty_label: Option<&'static str>,
    pub published_on: String,
    pub ctf_on: Option<String>,
    pub event_on: Option<String>,
}

impl PostCard {
    pub fn new(post: Post, categories: &[Category]) -> Self {
        let category = categories.iter().find(|c| c.slug == post.category);
        Self {
            category_label: category
                .map(|c| c.label.clone())
                .unwrap_or_else(|| post.category.clone()),
            category_color: category.map(|c| c.color.clone()).unwrap_or_default(),
            difficulty_label: post.difficulty.map(|d| d.label()),
            published_on: format_date_fr(&post.published_at),
            ctf_on: post.ctf_date.as_ref().map(format_date_fr),
            event_on: post.event_date.as_ref().map(format_date_fr),
            post,
        }
    }
}

#[derive(Debug, Serialize)]
struct PostView {
    #[serde(flatten)]
    card: PostCard,
    content_html: String,
}

/// Contact form fields as posted by the browser
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub company: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
    /// Checkbox, present only when ticked
    pub consent: Option<String>,
}

impl From<ContactForm> for ContactInput {
    fn from(form: ContactForm) -> Self {
        let optional = |s: String| if s.trim().is_empty() { None } else { Some(s) };
        Self {
            company: optional(form.company),
            name: form.name,
            email: form.email,
            phone: optional(form.phone),
            subject: form.subject,
            message: form.message,
            consent: form.consent.is_some(),
        }
    }
}

/// State of the contact section of the home page
#[derive(Debug, Default, Serialize)]
struct ContactView {
    success: bool,
    errors: HashMap<&'static str, String>,
    values: ContactForm,
}

#[derive(Debug, Deserialize)]
pub struct JournalQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

fn render(
    state: &AppState,
    template: &str,
    context: &TeraContext,
    vars: &StandardTemplateVars,
) -> Html<String> {
    Html(state.theme_engine.render_with_fallback(template, context, vars))
}

fn vars(state: &AppState, path: &str) -> StandardTemplateVars {
    StandardTemplateVars::new(&state.config.site, path)
}

/// Header navigation: active services and journal categories.
/// A failure only hides the submenus.
async fn insert_nav(state: &AppState, context: &mut TeraContext) {
    match state.catalog_service.list(false).await {
        Ok(services) => context.insert("nav_services", &services),
        Err(e) => tracing::warn!("Failed to load navigation services: {}", e),
    }
    match state.category_service.list().await {
        Ok(categories) => context.insert("nav_categories", &categories),
        Err(e) => tracing::warn!("Failed to load navigation categories: {}", e),
    }
}

async fn error_page(state: &AppState, path: &str, error: ApiError) -> Response {
    let mut context = TeraContext::new();
    insert_nav(state, &mut context).await;
    context.insert("error_message", &error.error.message);
    (error.status(), render(state, "error.html", &context, &vars(state, path))).into_response()
}

/// Everything on the home page except the contact section
async fn home_context(state: &AppState) -> Result<TeraContext, ApiError> {
    let services = state.catalog_service.list(false).await?;
    let method_steps = state.method_step_service.list_public().await?;
    let stats = state.stats_service.list().await?;
    let categories = state.category_service.list().await?;
    let team = state.team_service.list(false).await?;
    let posts: Vec<PostCard> = state
        .post_service
        .latest_published(HOME_LATEST_POSTS)
        .await?
        .into_iter()
        .map(|post| PostCard::new(post, &categories))
        .collect();

    let mut context = TeraContext::new();
    context.insert("nav_services", &services);
    context.insert("nav_categories", &categories);
    context.insert("services", &services);
    context.insert("method_steps", &method_steps);
    context.insert("stats", &stats);
    context.insert("posts", &posts);
    context.insert("team", &team);
    Ok(context)
}

async fn render_home(state: &AppState, path: &str, status: StatusCode, contact: ContactView) -> Response {
    match home_context(state).await {
        Ok(mut context) => {
            context.insert("contact", &contact);
            (status, render(state, "index.html", &context, &vars(state, path))).into_response()
        }
        Err(e) => error_page(state, path, e).await,
    }
}

async fn home(State(state): State<AppState>) -> Response {
    render_home(&state, "/", StatusCode::OK, ContactView::default()).await
}

async fn contact_submit(State(state): State<AppState>, Form(form): Form<ContactForm>) -> Response {
    match state.contact_service.submit(form.clone().into()).await {
        Ok(_) => {
            let view = ContactView {
                success: true,
                ..ContactView::default()
            };
            render_home(&state, "/contact", StatusCode::OK, view).await
        }
        Err(ContactServiceError::ValidationError(fields)) => {
            let view = ContactView {
                success: false,
                errors: fields.into_iter().map(|f| (f.field, f.message)).collect(),
                values: form,
            };
            render_home(&state, "/contact", StatusCode::BAD_REQUEST, view).await
        }
        Err(e) => error_page(&state, "/contact", e.into()).await,
    }
}

async fn journal_context(state: &AppState, current: Option<&str>) -> Result<TeraContext, ApiError> {
    let categories = state.category_service.list().await?;
    let posts = state.post_service.list_published(current).await?;

    let (featured, regular): (Vec<PostCard>, Vec<PostCard>) = posts
        .into_iter()
        .map(|post| PostCard::new(post, &categories))
        .partition(|card| card.post.featured);

    let current_label = current
        .map(|slug| {
            categories
                .iter()
                .find(|c| c.slug == slug)
                .map(|c| c.label.clone())
                .unwrap_or_else(|| slug.to_string())
        })
        .unwrap_or_default();

    let mut context = TeraContext::new();
    insert_nav(state, &mut context).await;
    context.insert("categories", &categories);
    context.insert("current_category", current.unwrap_or_default());
    context.insert("current_category_label", &current_label);
    context.insert("featured_posts", &featured);
    context.insert("regular_posts", &regular);
    Ok(context)
}

async fn journal(State(state): State<AppState>, Query(query): Query<JournalQuery>) -> Response {
    let path = "/journal";
    let current = query.category.filter(|c| !c.is_empty() && c != "all");

    match journal_context(&state, current.as_deref()).await {
        Ok(context) => render(&state, "journal.html", &context, &vars(&state, path)).into_response(),
        Err(e) => error_page(&state, path, e).await,
    }
}

async fn post_page(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let path = format!("/journal/{}", slug);

    let post = match state.post_service.get_published_by_slug(&slug).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found_response(&state, &path).await,
        Err(e) => return error_page(&state, &path, e.into()).await,
    };
    let categories = match state.category_service.list().await {
        Ok(categories) => categories,
        Err(e) => return error_page(&state, &path, e.into()).await,
    };

    let content_html = state.markdown.render(&post.content);
    let view = PostView {
        card: PostCard::new(post, &categories),
        content_html,
    };

    let mut context = TeraContext::new();
    insert_nav(&state, &mut context).await;
    context.insert("post", &view);
    render(&state, "post.html", &context, &vars(&state, &path)).into_response()
}

async fn legal(State(state): State<AppState>) -> Response {
    let mut context = TeraContext::new();
    insert_nav(&state, &mut context).await;
    render(&state, "legal.html", &context, &vars(&state, "/mentions-legales")).into_response()
}

fn login_form(state: &AppState, status: StatusCode, error: Option<&str>, email: &str) -> Response {
    let mut context = TeraContext::new();
    context.insert("error", &error);
    context.insert("email", email);
    (status, render(state, "admin/login.html", &context, &vars(state, "/admin"))).into_response()
}

async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Ok(Some(_)) = current_admin(&state, &headers).await {
        return Redirect::to("/admin/dashboard").into_response();
    }
    login_form(&state, StatusCode::OK, None, "")
}

async fn login_submit(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth_service.login(&form.email, &form.password, client_ip).await {
        Ok(outcome) => {
            tracing::info!("Admin {} signed in", outcome.admin.id);
            let cookie = session_cookie(&state.config.session, &outcome.session.id);
            ([(header::SET_COOKIE, cookie)], Redirect::to("/admin/dashboard")).into_response()
        }
        Err(e) => {
            let error = ApiError::from(e);
            login_form(&state, error.status(), Some(&error.error.message), &form.email)
        }
    }
}

async fn dashboard_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let path = "/admin/dashboard";
    let admin = match current_admin(&state, &headers).await {
        Ok(Some(admin)) => admin,
        Ok(None) => return Redirect::to("/admin").into_response(),
        Err(e) => return error_page(&state, path, e).await,
    };

    match summary_for(&state, &admin).await {
        Ok(summary) => {
            let mut context = TeraContext::new();
            context.insert("summary", &summary);
            let vars = vars(&state, path).with_admin(&admin);
            render(&state, "admin/dashboard.html", &context, &vars).into_response()
        }
        Err(e) => error_page(&state, path, e).await,
    }
}

async fn logout_submit(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers, &state.config.session.cookie_name) {
        if let Err(e) = state.auth_service.logout(&token).await {
            tracing::warn!("Failed to delete session on logout: {}", e);
        }
    }
    let cookie = clear_session_cookie(&state.config.session);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/admin")).into_response()
}

async fn not_found_response(state: &AppState, path: &str) -> Response {
    let mut context = TeraContext::new();
    insert_nav(state, &mut context).await;
    (StatusCode::NOT_FOUND, render(state, "404.html", &context, &vars(state, path))).into_response()
}

/// Fallback for every unmatched route
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        return ApiError::not_found("Ressource introuvable").into_response();
    }
    not_found_response(&state, uri.path()).await
}
