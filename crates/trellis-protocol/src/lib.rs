//! Message vocabulary spoken over a live session.
//!
//! Every message travels as a JSON array whose first element names the
//! message kind, e.g. `["update-text", "#title", "Hello"]`.

mod client;
mod wire;

pub use client::ClientMessage;
pub use wire::{AttrPatch, WireMessage};

use thiserror::Error;

/// Errors raised while decoding a message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Message must be a non-empty array tagged with its kind")]
    NotTagged,

    #[error("Unknown message kind: {0}")]
    UnknownKind(String),

    #[error("Malformed '{kind}' message: {reason}")]
    Malformed { kind: String, reason: &'static str },
}

impl ProtocolError {
    fn malformed(kind: &str, reason: &'static str) -> Self {
        Self::Malformed {
            kind: kind.to_string(),
            reason,
        }
    }
}

/// Splits a tagged array into its kind and remaining fields.
fn split_tagged(
    value: serde_json::Value,
) -> Result<(String, Vec<serde_json::Value>), ProtocolError> {
    let serde_json::Value::Array(mut items) = value else {
        return Err(ProtocolError::NotTagged);
    };
    if items.is_empty() {
        return Err(ProtocolError::NotTagged);
    }
    match items.remove(0) {
        serde_json::Value::String(kind) => Ok((kind, items)),
        _ => Err(ProtocolError::NotTagged),
    }
}

fn take_string(
    fields: &mut std::vec::IntoIter<serde_json::Value>,
    kind: &str,
    reason: &'static str,
) -> Result<String, ProtocolError> {
    match fields.next() {
        Some(serde_json::Value::String(s)) => Ok(s),
        _ => Err(ProtocolError::malformed(kind, reason)),
    }
}
