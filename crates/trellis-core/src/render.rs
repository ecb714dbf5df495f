//! Depth-first markup writer.

use crate::context::Context;
use crate::error::{self, Abort, RenderOutcome};
use crate::node::{AttributeValue, Component, ComponentKind, Element, Node, Props};
use crate::selector;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt::Write as _;

/// Elements that never take children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "img", "input", "br", "hr", "meta", "link", "base", "source", "track", "col", "param", "area",
];

/// Render `node` into the context's output.
///
/// Aborts (early terminate, message exceptions) stop all further output of
/// the pass and are reported to the caller.
pub fn render(node: &Node, ctx: &mut Context) -> RenderOutcome {
    write_node(node, ctx).into()
}

/// Render `node` into a string, whatever the context's delivery mode.
pub fn render_to_string(node: &Node, ctx: &mut Context) -> Result<String, Abort> {
    let (result, html) = ctx.capture(|ctx| write_node(node, ctx));
    result.map(|()| html)
}

/// Pre-render `node` under a static context into a raw node.
pub fn prerender(node: &Node, locale: &str) -> Result<Node, Abort> {
    let mut ctx = Context::new_static(locale);
    render_to_string(node, &mut ctx).map(Node::Raw)
}

/// Escape text content. Not safe for attribute values: quotes pass through.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape a value written between double quotes.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Decimal form of a number, spelled like a browser would.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        (if value > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if (1e-6..1e21).contains(&value.abs()) {
        value.to_string()
    } else {
        // exponent form outside the plain range, with an explicit `+`
        let exp = format!("{value:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    }
}

fn write_node(node: &Node, ctx: &mut Context) -> Result<(), Abort> {
    match node {
        Node::Empty => {}
        Node::Text(text) => ctx.write(&escape_text(text)),
        Node::Number(value) => ctx.write(&format_number(*value)),
        Node::Raw(markup) => ctx.write(markup),
        Node::Fragment(children) => write_children(children, ctx)?,
        Node::Element(element) => write_element(element, ctx)?,
        Node::Component(component) => write_component(component, ctx)?,
    }
    Ok(())
}

fn write_children(children: &[Node], ctx: &mut Context) -> Result<(), Abort> {
    children.iter().try_for_each(|child| write_node(child, ctx))
}

fn write_component(component: &Component, ctx: &mut Context) -> Result<(), Abort> {
    let f = match &component.kind {
        ComponentKind::Flush => {
            ctx.flush();
            return Ok(());
        }
        ComponentKind::Invoke(f) => f,
    };
    let props = Props {
        attrs: &component.attrs,
        children: component.children.as_deref(),
    };
    let node = match f(&props, ctx) {
        Ok(node) => node,
        Err(err) => error::recover(err, ctx)?,
    };
    write_node(&node, ctx)
}

fn write_element(element: &Element, ctx: &mut Context) -> Result<(), Abort> {
    if element.selector.is_empty() {
        return write_children(element.children.as_deref().unwrap_or_default(), ctx);
    }
    let selector = match selector::parse(&element.selector) {
        Ok(selector) => selector,
        Err(err) => {
            let fallback = error::recover(err.into(), ctx)?;
            return write_node(&fallback, ctx);
        }
    };

    let mut html = String::with_capacity(32);
    html.push('<');
    html.push_str(selector.tag);
    if let Some(id) = selector.id {
        let _ = write!(html, " id=\"{id}\"");
    }
    for attr in &selector.attrs {
        html.push(' ');
        html.push_str(attr);
    }
    if !selector.classes.is_empty() {
        let _ = write!(html, " class=\"{}\"", selector.classes.join(" "));
    }
    for (name, value) in element.attrs.iter() {
        write_attribute(&mut html, name, value, ctx);
    }
    html.push('>');
    ctx.write(&html);

    if VOID_ELEMENTS.contains(&selector.tag) {
        return Ok(());
    }
    if let Some(children) = &element.children {
        write_children(children, ctx)?;
    }
    ctx.write(&format!("</{}>", selector.tag));
    Ok(())
}

enum Emit<'a> {
    Skip,
    Bare,
    Quoted(Cow<'a, str>),
}

fn classify<'a>(value: &'a AttributeValue, ctx: &Context) -> Emit<'a> {
    match value {
        AttributeValue::Absent | AttributeValue::Bool(false) => Emit::Skip,
        AttributeValue::Bool(true) => Emit::Bare,
        AttributeValue::Str(s) if s.is_empty() => Emit::Bare,
        AttributeValue::Str(s) => Emit::Quoted(Cow::Borrowed(s.as_str())),
        AttributeValue::Number(n) => Emit::Quoted(Cow::Owned(format_number(*n))),
        AttributeValue::Locale(text) => match ctx.resolve_locale(text) {
            s if s.is_empty() => Emit::Bare,
            s => Emit::Quoted(Cow::Owned(s)),
        },
        AttributeValue::Json(json) => match json {
            Value::Null | Value::Bool(false) => Emit::Skip,
            Value::Bool(true) => Emit::Bare,
            Value::String(s) if s.is_empty() => Emit::Bare,
            Value::String(s) => Emit::Quoted(Cow::Borrowed(s.as_str())),
            other => Emit::Quoted(Cow::Owned(other.to_string())),
        },
    }
}

fn write_attribute(html: &mut String, name: &str, value: &AttributeValue, ctx: &Context) {
    match classify(value, ctx) {
        Emit::Skip => {}
        Emit::Bare => {
            html.push(' ');
            html.push_str(name);
        }
        Emit::Quoted(value) => {
            let _ = write!(html, " {name}=\"{}\"", escape_attribute(&value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LocaleText;
    use crate::node::el;

    fn render_static(node: impl Into<Node>) -> String {
        let mut ctx = Context::new_static("en");
        render_to_string(&node.into(), &mut ctx).unwrap()
    }

    #[test]
    fn test_text_escaping_leaves_quotes() {
        assert_eq!(escape_text(r#"a & "b" <c>"#), r#"a &amp; "b" &lt;c&gt;"#);
        assert!(matches!(escape_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(escape_attribute(r#"say "hi" & go"#), "say &quot;hi&quot; &amp; go");
        assert_eq!(escape_attribute("<b>"), "<b>");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_number_exponent_form() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e30), "-2.5e+30");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-10), "1.5e-10");
        assert_eq!(format_number(123456789012345680000.0), "123456789012345680000");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(9.5e-7), "9.5e-7");
    }

    #[test]
    fn test_leaf_nodes() {
        assert_eq!(render_static(Node::Empty), "");
        assert_eq!(render_static(42), "42");
        assert_eq!(render_static(Node::raw("<b>&</b>")), "<b>&</b>");
        assert_eq!(render_static(Node::fragment(["a", "<", "b"])), "a&lt;b");
    }

    #[test]
    fn test_attribute_rules() {
        let html = render_static(
            el("input")
                .attr("disabled", true)
                .attr("hidden", false)
                .attr("placeholder", None::<String>)
                .attr("value", "")
                .attr("title", r#"5" screen"#)
                .attr("max", 10)
                .attr("data-cfg", serde_json::json!({"a": 1})),
        );
        assert_eq!(
            html,
            r#"<input disabled value title="5&quot; screen" max="10" data-cfg="{&quot;a&quot;:1}">"#
        );
    }

    #[test]
    fn test_locale_attribute_is_resolved() {
        let mut ctx = Context::new_static("zh_hk");
        let node: Node = el("img")
            .attr("alt", LocaleText::new().with("en", "Cat").with("zh_hk", "貓"))
            .into();
        assert_eq!(render_to_string(&node, &mut ctx).unwrap(), r#"<img alt="貓">"#);
    }

    #[test]
    fn test_selector_parts_order() {
        let html = render_static(el("a#top.nav.dark[href=/]").attr("rel", "nofollow").child("x"));
        assert_eq!(html, r#"<a id="top" href=/ class="nav dark" rel="nofollow">x</a>"#);
    }

    #[test]
    fn test_void_element_ignores_children() {
        assert_eq!(render_static(el("br").child("ignored")), "<br>");
    }

    #[test]
    fn test_empty_selector_renders_children_only() {
        assert_eq!(render_static(el("").children(["a", "b"])), "ab");
    }

    #[test]
    fn test_bad_selector_renders_error_block() {
        let html = render_static(el("#oops").child("x"));
        assert_eq!(
            html,
            r#"<p class="error">failed to parse tag name, selector: #oops</p>"#
        );
    }

    #[test]
    fn test_prerender_wraps_markup() {
        let node = prerender(&el("b").child("&").into(), "en").unwrap();
        assert!(matches!(node, Node::Raw(ref html) if html == "<b>&amp;</b>"));
    }
}
