//! Public site information API
//!
//! GET /api/v1/site - Organization identity with the home page figures and
//! the journal categories, for clients that render their own pages.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::config::SiteConfig;
use crate::models::{Category, SiteStat};

/// Response for public site info
#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub version: &'static str,
    pub site: SiteConfig,
    pub stats: Vec<SiteStat>,
    pub categories: Vec<Category>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_site_info))
}

async fn get_site_info(State(state): State<AppState>) -> Result<Json<SiteInfoResponse>, ApiError> {
    let stats = state.stats_service.list().await?;
    let categories = state.category_service.list().await?;

    Ok(Json(SiteInfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        site: state.config.site.clone(),
        stats,
        categories,
    }))
}
