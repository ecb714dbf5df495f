use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render task failed: {0}")]
    Render(#[from] tokio::task::JoinError),

    #[error("Render pass for {0} ended without a response")]
    NoResponse(String),

    #[error("Invalid response: {0}")]
    Response(#[from] axum::http::Error),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(Method),
}

impl From<trellis_config::ConfigError> for WebError {
    fn from(err: trellis_config::ConfigError) -> Self {
        WebError::Config(err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
