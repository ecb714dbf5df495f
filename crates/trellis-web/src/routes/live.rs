//! Live session websocket endpoint

use crate::app::locale_from_headers;
use crate::server::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use trellis_core::{ClientMessage, LiveSession, Principal};

pub fn live_routes(path: &str) -> Router<AppState> {
    Router::new().route(path, get(live_handler))
}

async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let principal = state.app.principals().lookup(&headers);
    let locale = locale_from_headers(&headers, state.app.default_locale());
    ws.on_upgrade(move |socket| handle_socket(socket, state, principal, locale))
}

/// One connection: register, pump outbound messages, handle inbound
/// messages one at a time, unregister on close.
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    principal: Option<Principal>,
    locale: String,
) {
    let (mut sink, mut stream) = socket.split();
    let (session, mut outbound) = LiveSession::channel("/");
    session.set_locale(locale);
    let id = session.id();
    state.registry.register(Arc::clone(&session));
    tracing::info!(session = %id, "Live session connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if sink.send(Message::Text(message.to_json().into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(session = %id, "Socket error: {}", e);
                break;
            }
        };
        let message = match ClientMessage::parse(text.as_str()) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(session = %id, "Ignoring client message: {}", e);
                continue;
            }
        };

        let app = Arc::clone(&state.app);
        let session = Arc::clone(&session);
        let principal = principal.clone();
        let pass = tokio::task::spawn_blocking(move || {
            app.handle_client_message(&session, principal, message)
        });
        if let Err(e) = pass.await {
            tracing::error!(session = %id, "Live render pass failed: {}", e);
        }
    }

    // closing the session drops its sender, which ends the writer
    state.registry.unregister(id);
    let _ = writer.await;
    tracing::info!(session = %id, "Live session disconnected");
}
