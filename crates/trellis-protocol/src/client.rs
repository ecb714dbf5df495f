//! Client to server messages.

use crate::{split_tagged, take_string, ProtocolError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// A message received from a live page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum ClientMessage {
    /// The page finished loading and attached to the session.
    Mount { url: String, locale: Option<String> },

    /// In-place navigation requested by a link click.
    Navigate { url: String },

    /// A form submission or other interaction targeting `url`.
    Event {
        url: String,
        form: HashMap<String, String>,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Json(e.to_string()))?;
        Self::try_from(value)
    }

    /// The url the message refers to.
    pub fn url(&self) -> &str {
        match self {
            ClientMessage::Mount { url, .. }
            | ClientMessage::Navigate { url }
            | ClientMessage::Event { url, .. } => url,
        }
    }
}

impl TryFrom<Value> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let (kind, fields) = split_tagged(value)?;
        let mut fields = fields.into_iter();
        match kind.as_str() {
            "mount" => {
                let url = take_string(&mut fields, &kind, "missing url")?;
                let locale = match fields.next() {
                    Some(Value::String(locale)) if !locale.is_empty() => Some(locale),
                    _ => None,
                };
                Ok(ClientMessage::Mount { url, locale })
            }
            "navigate" => Ok(ClientMessage::Navigate {
                url: take_string(&mut fields, &kind, "missing url")?,
            }),
            "event" => {
                let url = take_string(&mut fields, &kind, "missing url")?;
                let form = match fields.next() {
                    None | Some(Value::Null) => HashMap::new(),
                    Some(Value::Object(map)) => map
                        .into_iter()
                        .filter_map(|(name, value)| match value {
                            Value::Null => None,
                            Value::String(s) => Some((name, s)),
                            other => Some((name, other.to_string())),
                        })
                        .collect(),
                    Some(_) => {
                        return Err(ProtocolError::malformed(&kind, "form must be an object"))
                    }
                };
                Ok(ClientMessage::Event { url, form })
            }
            _ => Err(ProtocolError::UnknownKind(kind)),
        }
    }
}
