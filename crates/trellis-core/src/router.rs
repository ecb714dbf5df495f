//! Path matching and the routing meta-components.
//!
//! [`Router`] matches request paths against patterns made of literal,
//! `:param` and trailing `*` segments. [`switch`] attaches the match to the
//! render context before the matched node is evaluated. [`link`] and
//! [`redirect`] are the navigation primitives pages build on.

use crate::context::{Context, ContextKind};
use crate::error::ComponentError;
use crate::node::{component, el, AttributeValue, Attributes, Element, Node};
use crate::render::{escape_attribute, escape_text};
use std::collections::HashMap;
use std::sync::Arc;
use trellis_protocol::WireMessage;

/// Status used by [`redirect`] when none is given.
pub const DEFAULT_REDIRECT_STATUS: u16 = 303;

/// Captures of a matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    /// Pattern the path matched.
    pub pattern: String,
    /// Decoded `:param` captures. A trailing wildcard is captured as `*`.
    pub params: HashMap<String, String>,
    /// Query string without the leading `?`.
    pub search: String,
}

impl RouteParams {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of a query parameter, decoded.
    pub fn query(&self, name: &str) -> Option<String> {
        parse_urlencoded(&self.search)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Decode `a=1&b=two+words` pairs, as sent in query strings and form bodies.
pub fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Param(_) => 1,
            Segment::Wildcard => 2,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    pattern: String,
    segments: Vec<Segment>,
    value: T,
}

/// A successful match.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a, T> {
    pub value: &'a T,
    pub params: RouteParams,
}

/// Route table keyed by path pattern.
#[derive(Debug, Clone)]
pub struct Router<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `pattern`. A `*` segment swallows the rest of
    /// the path, so anything after it is ignored.
    pub fn add(&mut self, pattern: impl Into<String>, value: T) -> &mut Self {
        let pattern = pattern.into();
        let mut segments = Vec::new();
        for part in path_segments(&pattern) {
            if part == "*" {
                segments.push(Segment::Wildcard);
                break;
            }
            match part.strip_prefix(':') {
                Some(name) => segments.push(Segment::Param(name.to_string())),
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }
        self.entries.push(Entry {
            pattern,
            segments,
            value,
        });
        self
    }

    pub fn with(mut self, pattern: impl Into<String>, value: T) -> Self {
        self.add(pattern, value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match a url (path, optional query, optional fragment).
    ///
    /// When several patterns match, literal segments beat params and params
    /// beat wildcards, compared left to right. Ties go to the earlier entry.
    pub fn route(&self, url: &str) -> Option<RouteMatch<'_, T>> {
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        let (path, search) = url.split_once('?').unwrap_or((url, ""));
        let parts: Vec<&str> = path_segments(path).collect();

        self.entries
            .iter()
            .filter_map(|entry| Some((entry, capture(&entry.segments, &parts)?)))
            .min_by_key(|(entry, _)| entry.segments.iter().map(Segment::rank).collect::<Vec<_>>())
            .map(|(entry, params)| RouteMatch {
                value: &entry.value,
                params: RouteParams {
                    pattern: entry.pattern.clone(),
                    params,
                    search: search.to_string(),
                },
            })
    }
}

fn capture(segments: &[Segment], parts: &[&str]) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Wildcard => {
                params.insert("*".to_string(), decode(&parts[index.min(parts.len())..].join("/")));
                return Some(params);
            }
            Segment::Literal(literal) => {
                if decode(parts.get(index)?) != *literal {
                    return None;
                }
            }
            Segment::Param(name) => {
                params.insert(name.clone(), decode(parts.get(index)?));
            }
        }
    }
    (segments.len() == parts.len()).then_some(params)
}

/// Component rendering the node routed for the context's url, or `default`.
/// The match is attached to the context first so nested components can read
/// its params.
pub fn switch(router: Arc<Router<Node>>, default: impl Into<Node>) -> Node {
    let default = default.into();
    component(move |_, ctx| match router.route(ctx.url()) {
        Some(matched) => {
            ctx.set_route(matched.params);
            Ok(matched.value.clone())
        }
        None => Ok(default.clone()),
    })
    .into()
}

/// Attributes of a client-side navigation link.
#[derive(Debug, Clone, Default)]
pub struct LinkAttrs {
    pub tag_name: Option<String>,
    pub href: String,
    /// Skip the history push.
    pub no_history: bool,
    /// Skip the transition animation.
    pub no_animation: bool,
    /// Navigate as if going back.
    pub is_back: bool,
    pub hidden: bool,
    pub attrs: Attributes,
    pub children: Vec<Node>,
}

impl LinkAttrs {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    pub fn tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = Some(tag.into());
        self
    }

    pub fn no_history(mut self) -> Self {
        self.no_history = true;
        self
    }

    pub fn no_animation(mut self) -> Self {
        self.no_animation = true;
        self
    }

    pub fn is_back(mut self) -> Self {
        self.is_back = true;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Packed flag string handed to the client click handler.
    pub fn flags(&self) -> String {
        [
            (self.no_history, 'q'),
            (self.no_animation, 'f'),
            (self.is_back, 'b'),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, flag)| *flag)
        .collect()
    }
}

/// Build a link whose clicks are handled by the client runtime.
pub fn link(attrs: LinkAttrs) -> Element {
    let flags = attrs.flags();
    let onclick = if flags.is_empty() {
        "emitHref(event)".to_string()
    } else {
        format!("emitHref(event,'{flags}')")
    };
    let tag = attrs.tag_name.unwrap_or_else(|| "a".to_string());
    if attrs.children.is_empty() && tag == "a" {
        tracing::warn!(href = %attrs.href, "Link with empty content");
    }

    let mut element = el(tag)
        .attr("onclick", onclick)
        .attr("hidden", attrs.hidden)
        .attr("href", attrs.href)
        .attrs(attrs.attrs);
    if !attrs.children.is_empty() {
        element = element.children(attrs.children);
    }
    element
}

/// Navigation away from the current page, acted out per delivery mode.
#[derive(Debug, Clone)]
pub struct Redirect {
    pub href: String,
    /// Ask for a full page load instead of an in-place transition.
    pub full: bool,
    pub status: Option<u16>,
}

pub fn redirect(href: impl Into<String>) -> Redirect {
    Redirect {
        href: href.into(),
        full: false,
        status: None,
    }
}

impl Redirect {
    pub fn full(mut self) -> Self {
        self.full = true;
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Perform the redirect. Returns the node to render in static passes and
    /// [`ComponentError::Terminate`] wherever the response was handled.
    pub fn apply(&self, ctx: &mut Context) -> Result<Node, ComponentError> {
        match ctx.kind() {
            ContextKind::RequestResponse => {
                if let Some(transport) = ctx.transport_mut() {
                    if transport.headers_sent() {
                        transport.write(&redirect_page(&self.href));
                        transport.flush();
                    } else {
                        let status = self.status.unwrap_or(DEFAULT_REDIRECT_STATUS);
                        transport.redirect(status, &self.href);
                    }
                }
                Err(ComponentError::Terminate)
            }
            ContextKind::LiveSession => {
                if let Some(session) = ctx.session() {
                    session.set_url(self.href.as_str());
                    let message = if self.full {
                        WireMessage::full_redirect(self.href.as_str())
                    } else {
                        WireMessage::redirect(self.href.as_str())
                    };
                    session.send(message);
                }
                Err(ComponentError::Terminate)
            }
            ContextKind::Static => Ok(el("a")
                .attr("href", self.href.as_str())
                .attr("data-live", "redirect")
                .attr("data-full", self.full)
                .children(["Redirect to ", self.href.as_str()])
                .into()),
        }
    }
}

impl From<Redirect> for Node {
    fn from(redirect: Redirect) -> Self {
        component(move |_, ctx| redirect.apply(ctx)).into()
    }
}

/// Client-side fallback written once headers are already on the wire.
pub fn redirect_page(href: &str) -> String {
    let target = serde_json::Value::String(href.to_string())
        .to_string()
        .replace('<', "\\u003c");
    format!(
        "\n<p>Redirect to <a href=\"{}\">{}</a></p>\n<script>\n  location.href = {}\n</script>\n",
        escape_attribute(href),
        escape_text(href),
        target
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BufferedResponse;
    use crate::render::render_to_string;
    use crate::session::LiveSession;

    fn table() -> Router<&'static str> {
        Router::new()
            .with("/", "home")
            .with("/users/:id", "user")
            .with("/users/me", "me")
            .with("/files/*", "files")
            .with("/users/:id/*", "user-any")
    }

    #[test]
    fn test_static_beats_param() {
        let router = table();
        assert_eq!(*router.route("/users/me").unwrap().value, "me");
        let matched = router.route("/users/42").unwrap();
        assert_eq!(*matched.value, "user");
        assert_eq!(matched.params.param("id"), Some("42"));
        assert_eq!(matched.params.pattern, "/users/:id");
    }

    #[test]
    fn test_wildcard_captures_rest() {
        let router = table();
        let matched = router.route("/files/a/b%20c.txt").unwrap();
        assert_eq!(*matched.value, "files");
        assert_eq!(matched.params.param("*"), Some("a/b c.txt"));
        assert_eq!(*router.route("/users/42/posts/1").unwrap().value, "user-any");
    }

    #[test]
    fn test_search_and_fragment() {
        let table = table();
        let matched = table.route("/users/7?tab=posts&q=a+b#top").unwrap();
        assert_eq!(matched.params.search, "tab=posts&q=a+b");
        assert_eq!(matched.params.query("q").as_deref(), Some("a b"));
        assert_eq!(matched.params.query("missing"), None);
    }

    #[test]
    fn test_parse_urlencoded() {
        assert_eq!(
            parse_urlencoded("epoch=3&note=a+b%26c&flag&"),
            vec![
                ("epoch".to_string(), "3".to_string()),
                ("note".to_string(), "a b&c".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_no_match() {
        assert!(table().route("/nope").is_none());
        assert!(table().route("/users").is_none());
    }

    #[test]
    fn test_switch_attaches_match() {
        let mut router = Router::new();
        router.add(
            "/greet/:name",
            Node::from(component(|_, ctx| {
                Ok(Node::text(format!("hi {}", ctx.param("name").unwrap_or("?"))))
            })),
        );
        let node = switch(Arc::new(router), "not found");

        let mut ctx = Context::new_static("en").with_url("/greet/ann");
        assert_eq!(render_to_string(&node, &mut ctx).unwrap(), "hi ann");
        let mut ctx = Context::new_static("en").with_url("/other");
        assert_eq!(render_to_string(&node, &mut ctx).unwrap(), "not found");
    }

    #[test]
    fn test_link_attributes() {
        let node: Node = link(LinkAttrs::new("/stats").child("Stats")).into();
        let mut ctx = Context::new_static("en");
        assert_eq!(
            render_to_string(&node, &mut ctx).unwrap(),
            r#"<a onclick="emitHref(event)" href="/stats">Stats</a>"#
        );

        let node: Node = link(
            LinkAttrs::new("/back")
                .no_history()
                .is_back()
                .hidden(true)
                .tag_name("button")
                .attr("rel", "nofollow"),
        )
        .into();
        assert_eq!(
            render_to_string(&node, &mut ctx).unwrap(),
            concat!(
                r#"<button onclick="emitHref(event,'qb')" hidden href="/back" rel="nofollow">"#,
                "</button>"
            )
        );

        let node: Node = link(LinkAttrs::new("/plain").no_animation().child("x")).into();
        assert_eq!(
            render_to_string(&node, &mut ctx).unwrap(),
            r#"<a onclick="emitHref(event,'f')" href="/plain">x</a>"#
        );

        // flags always come out as q, f, b whatever order they were set in
        let attrs = LinkAttrs::new("/x").is_back().no_animation().no_history();
        assert_eq!(attrs.flags(), "qfb");
        let node: Node = link(attrs.child("x")).into();
        assert_eq!(
            render_to_string(&node, &mut ctx).unwrap(),
            r#"<a onclick="emitHref(event,'qfb')" href="/x">x</a>"#
        );
    }

    #[test]
    fn test_redirect_static_anchor() {
        let mut ctx = Context::new_static("en");
        let html = render_to_string(&redirect("/login").full().into(), &mut ctx).unwrap();
        assert_eq!(
            html,
            r#"<a href="/login" data-live="redirect" data-full>Redirect to /login</a>"#
        );
    }

    #[test]
    fn test_redirect_before_headers() {
        let response = BufferedResponse::new();
        let mut ctx = Context::request("/old", response.clone());
        let result = redirect("/new").apply(&mut ctx);
        assert!(matches!(result, Err(ComponentError::Terminate)));
        let state = response.snapshot();
        assert_eq!(state.status, 303);
        assert_eq!(state.location.as_deref(), Some("/new"));
    }

    #[test]
    fn test_redirect_after_headers_writes_fallback() {
        let response = BufferedResponse::streaming();
        let mut ctx = Context::request("/old", response.clone());
        ctx.flush();
        let result = redirect("/new").status(302).apply(&mut ctx);
        assert!(matches!(result, Err(ComponentError::Terminate)));
        let state = response.snapshot();
        assert_eq!(state.status, 200);
        assert!(state.body.contains(r#"location.href = "/new""#));
    }

    #[test]
    fn test_redirect_live_records_url() {
        let (session, mut rx) = LiveSession::channel("/old");
        let mut ctx = Context::live(session.clone());
        let result = redirect("/new").apply(&mut ctx);
        assert!(matches!(result, Err(ComponentError::Terminate)));
        assert_eq!(session.url(), "/new");
        assert_eq!(rx.try_recv().unwrap(), WireMessage::redirect("/new"));
    }

    #[test]
    fn test_redirect_page_escapes_script() {
        let page = redirect_page("/x?a=</script>");
        assert!(page.contains(r#"location.href = "/x?a=\u003c/script>""#));
        assert!(page.contains("&lt;/script&gt;"));
    }
}
