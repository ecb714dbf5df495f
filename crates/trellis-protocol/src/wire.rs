//! Server to client patch messages.

use crate::{split_tagged, take_string, ProtocolError};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UPDATE_TEXT: &str = "update-text";
const UPDATE_ATTRS: &str = "update-attrs";
const UPDATE_IN: &str = "update-in";
const EVAL: &str = "eval";
const BATCH: &str = "batch";
const REDIRECT: &str = "redirect";
const SHOW_ERROR: &str = "show-error";

/// A patch instruction for a page that was already delivered.
///
/// Messages sent to one session are applied by the client in send order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum WireMessage {
    /// Replace the text content of the first element matching `selector`.
    UpdateText { selector: String, text: String },

    /// Patch attributes of the first element matching `selector`.
    UpdateAttrs {
        selector: String,
        attrs: Vec<(String, AttrPatch)>,
    },

    /// Replace the inner markup of the first element matching `selector`.
    UpdateIn { selector: String, html: String },

    /// Run a script on the client.
    Eval(String),

    /// Apply the nested messages in order as one visual update.
    Batch(Vec<WireMessage>),

    /// Navigate to `path`; `full` requests a full page load.
    Redirect { path: String, full: bool },

    /// Show an already escaped error text on the client error surface.
    ShowError(String),
}

/// How one attribute of an `update-attrs` message is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPatch {
    /// Delete the attribute (`null`, `false`).
    Remove,
    /// Set the attribute to the empty string (`true`).
    Present,
    /// Set the attribute to the given value.
    Value(String),
}

impl WireMessage {
    pub fn update_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::UpdateText {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn update_attrs<K, I>(selector: impl Into<String>, attrs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttrPatch)>,
    {
        Self::UpdateAttrs {
            selector: selector.into(),
            attrs: attrs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn update_in(selector: impl Into<String>, html: impl Into<String>) -> Self {
        Self::UpdateIn {
            selector: selector.into(),
            html: html.into(),
        }
    }

    pub fn eval(code: impl Into<String>) -> Self {
        Self::Eval(code.into())
    }

    pub fn batch(messages: impl IntoIterator<Item = WireMessage>) -> Self {
        Self::Batch(messages.into_iter().collect())
    }

    pub fn redirect(path: impl Into<String>) -> Self {
        Self::Redirect {
            path: path.into(),
            full: false,
        }
    }

    pub fn full_redirect(path: impl Into<String>) -> Self {
        Self::Redirect {
            path: path.into(),
            full: true,
        }
    }

    pub fn show_error(escaped_text: impl Into<String>) -> Self {
        Self::ShowError(escaped_text.into())
    }

    /// The tag written as the first array element.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::UpdateText { .. } => UPDATE_TEXT,
            WireMessage::UpdateAttrs { .. } => UPDATE_ATTRS,
            WireMessage::UpdateIn { .. } => UPDATE_IN,
            WireMessage::Eval(_) => EVAL,
            WireMessage::Batch(_) => BATCH,
            WireMessage::Redirect { .. } => REDIRECT,
            WireMessage::ShowError(_) => SHOW_ERROR,
        }
    }

    /// Encode as the JSON text frame sent over the socket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Json(e.to_string()))?;
        Self::try_from(value)
    }
}

impl From<bool> for AttrPatch {
    fn from(flag: bool) -> Self {
        if flag {
            AttrPatch::Present
        } else {
            AttrPatch::Remove
        }
    }
}

impl From<&str> for AttrPatch {
    fn from(value: &str) -> Self {
        AttrPatch::Value(value.to_string())
    }
}

impl From<String> for AttrPatch {
    fn from(value: String) -> Self {
        AttrPatch::Value(value)
    }
}

impl<T: Into<AttrPatch>> From<Option<T>> for AttrPatch {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttrPatch::Remove, Into::into)
    }
}

impl From<Value> for AttrPatch {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => AttrPatch::Remove,
            Value::Bool(true) => AttrPatch::Present,
            Value::String(s) => AttrPatch::Value(s),
            other => AttrPatch::Value(other.to_string()),
        }
    }
}

impl Serialize for AttrPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttrPatch::Remove => serializer.serialize_none(),
            AttrPatch::Present => serializer.serialize_bool(true),
            AttrPatch::Value(value) => serializer.serialize_str(value),
        }
    }
}

struct AttrMap<'a>(&'a [(String, AttrPatch)]);

impl Serialize for AttrMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, patch) in self.0 {
            map.serialize_entry(name, patch)?;
        }
        map.end()
    }
}

impl Serialize for WireMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireMessage::UpdateText { selector, text } => {
                (UPDATE_TEXT, selector, text).serialize(serializer)
            }
            WireMessage::UpdateAttrs { selector, attrs } => {
                (UPDATE_ATTRS, selector, AttrMap(attrs)).serialize(serializer)
            }
            WireMessage::UpdateIn { selector, html } => {
                (UPDATE_IN, selector, html).serialize(serializer)
            }
            WireMessage::Eval(code) => (EVAL, code).serialize(serializer),
            WireMessage::Batch(messages) => (BATCH, messages).serialize(serializer),
            WireMessage::Redirect { path, full: true } => (REDIRECT, path, 1).serialize(serializer),
            WireMessage::Redirect { path, full: false } => (REDIRECT, path).serialize(serializer),
            WireMessage::ShowError(text) => (SHOW_ERROR, text).serialize(serializer),
        }
    }
}

impl TryFrom<Value> for WireMessage {
    type Error = ProtocolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let (kind, fields) = split_tagged(value)?;
        let mut fields = fields.into_iter();
        let message = match kind.as_str() {
            UPDATE_TEXT => WireMessage::UpdateText {
                selector: take_string(&mut fields, &kind, "missing selector")?,
                text: take_string(&mut fields, &kind, "missing text")?,
            },
            UPDATE_ATTRS => {
                let selector = take_string(&mut fields, &kind, "missing selector")?;
                let Some(Value::Object(map)) = fields.next() else {
                    return Err(ProtocolError::malformed(&kind, "attributes must be an object"));
                };
                WireMessage::UpdateAttrs {
                    selector,
                    attrs: map.into_iter().map(|(k, v)| (k, AttrPatch::from(v))).collect(),
                }
            }
            UPDATE_IN => WireMessage::UpdateIn {
                selector: take_string(&mut fields, &kind, "missing selector")?,
                html: take_string(&mut fields, &kind, "missing markup")?,
            },
            EVAL => WireMessage::Eval(take_string(&mut fields, &kind, "missing script")?),
            BATCH => {
                let Some(Value::Array(items)) = fields.next() else {
                    return Err(ProtocolError::malformed(&kind, "messages must be an array"));
                };
                WireMessage::Batch(
                    items
                        .into_iter()
                        .map(WireMessage::try_from)
                        .collect::<Result<_, _>>()?,
                )
            }
            REDIRECT => {
                let path = take_string(&mut fields, &kind, "missing path")?;
                let full = match fields.next() {
                    None | Some(Value::Null) => false,
                    Some(Value::Bool(flag)) => flag,
                    Some(Value::Number(n)) => n.as_i64() != Some(0),
                    Some(_) => return Err(ProtocolError::malformed(&kind, "invalid full flag")),
                };
                WireMessage::Redirect { path, full }
            }
            SHOW_ERROR => WireMessage::ShowError(take_string(&mut fields, &kind, "missing text")?),
            _ => return Err(ProtocolError::UnknownKind(kind)),
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_text_encoding() {
        let msg = WireMessage::update_text("#a", "x");
        assert_eq!(msg.to_json(), r##"["update-text","#a","x"]"##);
    }

    #[test]
    fn test_update_attrs_keeps_order_and_patch_kinds() {
        let msg = WireMessage::update_attrs(
            "#b",
            [
                ("disabled", AttrPatch::Present),
                ("hidden", AttrPatch::Remove),
                ("value", AttrPatch::from("42")),
            ],
        );
        assert_eq!(
            msg.to_json(),
            r##"["update-attrs","#b",{"disabled":true,"hidden":null,"value":"42"}]"##
        );
    }

    #[test]
    fn test_redirect_full_flag() {
        assert_eq!(WireMessage::redirect("/home").to_json(), r#"["redirect","/home"]"#);
        assert_eq!(
            WireMessage::full_redirect("/home").to_json(),
            r#"["redirect","/home",1]"#
        );
    }

    #[test]
    fn test_batch_nests_messages() {
        let msg = WireMessage::batch([
            WireMessage::update_text("#a", "x"),
            WireMessage::update_attrs("#b", [("disabled", AttrPatch::Present)]),
        ]);
        let value: Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(
            value,
            json!([
                "batch",
                [["update-text", "#a", "x"], ["update-attrs", "#b", {"disabled": true}]]
            ])
        );
    }

    #[test]
    fn test_decode_attribute_values() {
        let msg = WireMessage::from_json(
            r##"["update-attrs","#b",{"a":false,"b":true,"c":3,"d":null}]"##,
        )
        .unwrap();
        let WireMessage::UpdateAttrs { attrs, .. } = msg else {
            panic!("expected update-attrs");
        };
        let patches: Vec<_> = attrs.into_iter().map(|(_, p)| p).collect();
        assert_eq!(
            patches,
            vec![
                AttrPatch::Remove,
                AttrPatch::Present,
                AttrPatch::Value("3".into()),
                AttrPatch::Remove,
            ]
        );
    }

    #[test]
    fn test_decode_keeps_attribute_order() {
        let text = r##"["update-attrs","#b",{"z":true,"a":false}]"##;
        let msg = WireMessage::from_json(text).unwrap();
        assert_eq!(
            msg,
            WireMessage::update_attrs("#b", [("z", AttrPatch::Present), ("a", AttrPatch::Remove)])
        );
        assert_eq!(msg.to_json(), r##"["update-attrs","#b",{"z":true,"a":null}]"##);
    }

    #[test]
    fn test_decode_redirect_flag_variants() {
        let msg = WireMessage::from_json(r#"["redirect","/x",1]"#).unwrap();
        assert_eq!(msg, WireMessage::full_redirect("/x"));
        let msg = WireMessage::from_json(r#"["redirect","/x"]"#).unwrap();
        assert_eq!(msg, WireMessage::redirect("/x"));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let err = WireMessage::from_json(r#"["explode","now"]"#).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownKind("explode".into()));
    }

    #[test]
    fn test_decode_rejects_untagged() {
        assert_eq!(
            WireMessage::from_json(r#"{"type":"eval"}"#).unwrap_err(),
            ProtocolError::NotTagged
        );
        assert_eq!(WireMessage::from_json("[]").unwrap_err(), ProtocolError::NotTagged);
    }

    #[test]
    fn test_deserialize_through_serde() {
        let msg: WireMessage = serde_json::from_str(r#"["show-error","boom &amp; bust"]"#).unwrap();
        assert_eq!(msg, WireMessage::show_error("boom &amp; bust"));
        assert_eq!(msg.kind(), "show-error");
    }
}
