//! Small builders for `class` and `style` attribute values.

use std::fmt::Display;

/// Names whose flag is set, space separated.
pub fn class_names<'a, I>(flags: I) -> String
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    flags
        .into_iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| name)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join the non-empty names. `None` when nothing is left, so the result can
/// be passed straight to an attribute and omit it.
pub fn concat_class_names<'a, I>(names: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let joined = names
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// `name:value` pairs joined with `;`. Names are used as given.
pub fn inline_style<I, K, V>(styles: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    styles
        .into_iter()
        .map(|(name, value)| format!("{}:{value}", name.as_ref()))
        .collect::<Vec<_>>()
        .join(";")
}

/// Like [`inline_style`] for camelCase names (`fontSize` → `font-size`).
pub fn inline_camel_case_style<I, K, V>(styles: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    inline_style(
        styles
            .into_iter()
            .map(|(name, value)| (to_style_name(name.as_ref()), value)),
    )
}

fn to_style_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
