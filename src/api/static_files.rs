//! Static assets embedded in the binary
//!
//! GET /static/{*path} - stylesheet and the cosmic background script

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::RustEmbed;

use crate::api::middleware::AppState;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

pub fn router() -> Router<AppState> {
    Router::new().route("/{*path}", get(serve_asset))
}

async fn serve_asset(Path(path): Path<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(content) => (
            [
                (header::CONTENT_TYPE, get_content_type(&path)),
                (header::CACHE_CONTROL, "public, max-age=3600"),
            ],
            content.data.into_owned(),
        )
            .into_response(),
        None => {
            tracing::debug!("Static asset not found: {}", path);
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}

/// Get content type from file extension
fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_assets_present() {
        assert!(StaticAssets::get("css/site.css").is_some());
        assert!(StaticAssets::get("js/cosmic.js").is_some());
        assert!(StaticAssets::get("js/missing.js").is_none());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(get_content_type("css/site.css"), "text/css; charset=utf-8");
        assert_eq!(get_content_type("js/cosmic.js"), "application/javascript; charset=utf-8");
        assert_eq!(get_content_type("LICENSE"), "application/octet-stream");
    }
}
