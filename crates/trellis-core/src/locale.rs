//! Locale-tagged values.

use crate::context::Context;
use crate::node::{component, Node};

/// Locale used when neither the viewer's locale nor its language matches.
pub const FALLBACK_LOCALE: &str = "en";

/// A value with one text per locale, e.g. `en` / `zh_hk` / `zh_cn`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocaleText {
    entries: Vec<(String, String)>,
}

impl LocaleText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text that reads the same in every locale.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            entries: vec![(String::new(), text.into())],
        }
    }

    pub fn with(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.push((locale.into(), text.into()));
        self
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == locale)
            .map(|(_, t)| t.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, t)| (l.as_str(), t.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&str> for LocaleText {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

impl From<String> for LocaleText {
    fn from(text: String) -> Self {
        Self::plain(text)
    }
}

/// Maps a locale-tagged value to the string shown to the current viewer.
pub trait LocaleResolver: Send + Sync {
    fn resolve(&self, text: &LocaleText, locale: &str) -> String;
}

/// Exact locale, then language prefix (`zh_hk` → `zh`), then
/// [`FALLBACK_LOCALE`], then the first entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLocaleResolver;

impl LocaleResolver for DefaultLocaleResolver {
    fn resolve(&self, text: &LocaleText, locale: &str) -> String {
        let normalized = locale.replace('-', "_").to_lowercase();
        if let Some(found) = text.get(&normalized).or_else(|| text.get(locale)) {
            return found.to_string();
        }
        let language = normalized.split('_').next().unwrap_or_default();
        text.entries()
            .find(|(l, _)| l.split('_').next() == Some(language))
            .or_else(|| text.entries().find(|(l, _)| *l == FALLBACK_LOCALE))
            .or_else(|| text.entries().next())
            .map(|(_, t)| t.to_string())
            .unwrap_or_default()
    }
}

/// Component rendering the text for the viewer's locale.
pub fn locale_text(text: LocaleText) -> Node {
    component(move |_, ctx: &mut Context| Ok(Node::Text(ctx.resolve_locale(&text)))).into()
}

impl From<LocaleText> for Node {
    fn from(text: LocaleText) -> Self {
        locale_text(text)
    }
}
