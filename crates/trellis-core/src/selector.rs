//! Compact element selectors: `tag#id.class1.class2[attr1][attr2=value]`.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+").unwrap());
static ATTR_LIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]").unwrap());
static ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w-]+)").unwrap());
static CLASS_LIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.([\w-]+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse tag name, selector: {0}")]
pub struct SelectorError(pub String);

/// Markup parts of a parsed selector, borrowed from the selector string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector<'a> {
    pub tag: &'a str,
    pub id: Option<&'a str>,
    pub classes: Vec<&'a str>,
    /// Bracket contents, written into the opening tag verbatim.
    pub attrs: Vec<&'a str>,
}

/// Parse a selector.
///
/// Bracket segments are taken first so that `.` or `#` inside them never
/// count as classes or ids. When several id segments appear the first wins.
pub fn parse(selector: &str) -> Result<Selector<'_>, SelectorError> {
    let tag = TAG_NAME
        .find(selector)
        .ok_or_else(|| SelectorError(selector.to_string()))?;
    let rest = &selector[tag.end()..];

    let mut attrs = Vec::new();
    let mut spans = Vec::new();
    for caps in ATTR_LIST.captures_iter(rest) {
        if let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) {
            spans.push(whole.range());
            attrs.push(inner.as_str());
        }
    }

    let outside = |range: std::ops::Range<usize>| {
        !spans
            .iter()
            .any(|span| range.start < span.end && span.start < range.end)
    };

    let id = ID
        .captures_iter(rest)
        .filter_map(|caps| caps.get(1))
        .find(|m| outside(m.start() - 1..m.end()))
        .map(|m| m.as_str());

    let classes = CLASS_LIST
        .captures_iter(rest)
        .filter_map(|caps| caps.get(1))
        .filter(|m| outside(m.start() - 1..m.end()))
        .map(|m| m.as_str())
        .collect();

    Ok(Selector {
        tag: tag.as_str(),
        id,
        classes,
        attrs,
    })
}
