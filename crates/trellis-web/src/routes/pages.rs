//! Page dispatch over HTTP with streamed bodies

use crate::app::{locale_from_headers, PageRequest};
use crate::server::AppState;
use crate::stream::StreamingResponse;
use crate::{Result, WebError};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use trellis_core::parse_urlencoded;

/// Every path not claimed by another route is a page.
pub fn page_routes() -> Router<AppState> {
    Router::new().fallback(page_handler)
}

async fn page_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if !matches!(method, Method::GET | Method::HEAD | Method::POST) {
        return Err(WebError::MethodNotAllowed(method));
    }

    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let form: HashMap<String, String> = if method == Method::POST {
        parse_urlencoded(&String::from_utf8_lossy(&body))
            .into_iter()
            .collect()
    } else {
        HashMap::new()
    };
    let request = PageRequest {
        url: url.clone(),
        locale: locale_from_headers(&headers, state.app.default_locale()),
        principal: state.app.principals().lookup(&headers),
        form,
    };

    let (transport, channels) = StreamingResponse::new(state.app.is_streaming(&url));
    let app = Arc::clone(&state.app);
    let pass = tokio::task::spawn_blocking(move || app.render_http(request, transport));

    let head = match channels.head.await {
        Ok(head) => head,
        Err(_) => {
            pass.await?;
            return Err(WebError::NoResponse(url));
        }
    };
    tokio::spawn(async move {
        if let Err(e) = pass.await {
            tracing::error!("Render pass failed: {}", e);
        }
    });

    let status = StatusCode::from_u16(head.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::debug!(%method, url = %url, status = status.as_u16(), "Page response");

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8");
    if let Some(location) = head.location {
        builder = builder.header(header::LOCATION, location);
    }
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from_stream(UnboundedReceiverStream::new(channels.body).map(Ok::<_, Infallible>))
    };
    Ok(builder.body(body)?)
}
