//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use trellis_core::SessionRegistry;

pub fn health_routes(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .with_state(registry)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "trellis-web"
    }))
}

async fn ready_check(State(registry): State<Arc<SessionRegistry>>) -> Json<Value> {
    Json(json!({
        "status": "ready",
        "live_sessions": registry.len()
    }))
}
