use crate::app::App;
use crate::assets::asset_routes;
use crate::routes::{health_routes, live_routes, page_routes};
use crate::{Result, WebError};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use trellis_config::WebConfig;
use trellis_core::SessionRegistry;

/// Shared by the page and live handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(app: Arc<App>, registry: Arc<SessionRegistry>) -> Self {
        Self { app, registry }
    }
}

/// Assemble the full route tree. Pages are the fallback, so every other
/// route wins over a page with the same path.
pub fn build_router(config: &WebConfig, state: AppState) -> Router {
    let registry = Arc::clone(&state.registry);

    let mut dynamic = Router::new();
    if config.live.enabled {
        dynamic = dynamic.merge(live_routes(&config.live.path));
    }

    let mut app = dynamic
        .merge(page_routes())
        .with_state(state)
        .merge(health_routes(registry))
        .merge(asset_routes(config.static_dir.as_deref()))
        .layer(DefaultBodyLimit::max(config.max_body_size_bytes()));

    if let Some(cors) = cors_layer(&config.cors_origins) {
        app = app.layer(cors);
    }
    app
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Skipping CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

pub async fn start_server(config: &WebConfig, state: AppState) -> Result<()> {
    let app = build_router(config, state);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| WebError::Config(format!("Invalid address: {e}")))?;

    tracing::info!("Starting web server on http://{}", addr);
    if config.live.enabled {
        tracing::info!("Live sessions on ws://{}{}", addr, config.live.path);
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(WebError::Io)?;

    axum::serve(listener, app).await.map_err(WebError::Io)?;

    Ok(())
}
