//! Static asset serving
//!
//! - The client runtime is embedded via rust-embed
//! - `static_dir` additionally serves a directory under `/static`

use crate::app::CLIENT_SCRIPT;
use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rust_embed::Embed;
use tower_http::services::ServeDir;

/// Embedded client assets
#[derive(Embed)]
#[folder = "assets"]
struct Assets;

/// Create router for serving static assets
pub fn asset_routes(static_dir: Option<&str>) -> Router {
    let router = Router::new().route(CLIENT_SCRIPT, get(embedded_handler));
    match static_dir {
        Some(dir) => {
            tracing::info!("Serving static assets from: {}", dir);
            router.nest_service("/static", ServeDir::new(dir))
        }
        None => router,
    }
}

async fn embedded_handler(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match <Assets as Embed>::get(path) {
        Some(content) => respond_with_asset(path, content.data.into_owned()),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

fn respond_with_asset(path: &str, data: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime)],
        Body::from(data),
    )
        .into_response()
}
