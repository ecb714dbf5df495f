//! Route dispatch.
//!
//! [`App`] owns the route table and runs every render pass: full pages
//! wrapped in the document shell for HTTP requests, and route bodies patched
//! into the mount element for live sessions.

use crate::auth::{NoAuth, PrincipalLookup};
use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use trellis_config::WebConfig;
use trellis_core::{
    component, el, render, render_to_string, Abort, ClientMessage, Component, Context,
    DefaultLocaleResolver, Element, LiveSession, LocaleResolver, LocaleText, Node, Principal,
    RenderOutcome, ResponseTransport, RouteParams, Router, WireMessage, ERROR_STYLE,
    FALLBACK_LOCALE,
};

/// Status of the fallback page.
pub const NOT_FOUND_STATUS: u16 = 404;

/// Path of the client runtime script.
pub const CLIENT_SCRIPT: &str = "/live.js";

pub type DynamicNode = Arc<dyn Fn(&Context) -> Node + Send + Sync>;

/// Route body: a fixed tree or one built per pass.
#[derive(Clone)]
pub enum RouteNode {
    Static(Node),
    Dynamic(DynamicNode),
}

impl RouteNode {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&Context) -> Node + Send + Sync + 'static,
    {
        RouteNode::Dynamic(Arc::new(f))
    }

    fn to_node(&self) -> Node {
        match self {
            RouteNode::Static(node) => node.clone(),
            RouteNode::Dynamic(f) => {
                let f = Arc::clone(f);
                component(move |_, ctx| Ok(f(&*ctx))).into()
            }
        }
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteNode::Static(node) => f.debug_tuple("Static").field(node).finish(),
            RouteNode::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<Node> for RouteNode {
    fn from(node: Node) -> Self {
        RouteNode::Static(node)
    }
}

impl From<Element> for RouteNode {
    fn from(element: Element) -> Self {
        RouteNode::Static(element.into())
    }
}

impl From<Component> for RouteNode {
    fn from(component: Component) -> Self {
        RouteNode::Static(component.into())
    }
}

/// Route table entry.
#[derive(Debug, Clone)]
pub struct Route {
    pub title: LocaleText,
    pub description: LocaleText,
    pub node: RouteNode,
    /// Deliver the document head before the body is computed. Non-streaming
    /// routes buffer the whole page so late failures still set the status.
    pub streaming: bool,
}

impl Route {
    pub fn new(title: impl Into<LocaleText>, node: impl Into<RouteNode>) -> Self {
        Self {
            title: title.into(),
            description: LocaleText::new(),
            node: node.into(),
            streaming: true,
        }
    }

    pub fn description(mut self, description: impl Into<LocaleText>) -> Self {
        self.description = description.into();
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// One HTTP page request, decoupled from axum types.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// Path and query.
    pub url: String,
    pub locale: String,
    pub principal: Option<Principal>,
    pub form: HashMap<String, String>,
}

pub struct App {
    routes: Router<Route>,
    not_found: Route,
    locales: Arc<dyn LocaleResolver>,
    principals: Arc<dyn PrincipalLookup>,
    mount_selector: String,
    live_path: Option<String>,
    default_locale: String,
}

impl App {
    pub fn new(routes: Router<Route>) -> Self {
        let not_found = Route::new(
            LocaleText::new().with("en", "Not Found").with("zh_hk", "找不到頁面"),
            el("p.not-found").child("Page not found"),
        )
        .streaming(false);
        Self {
            routes,
            not_found,
            locales: Arc::new(DefaultLocaleResolver),
            principals: Arc::new(NoAuth),
            mount_selector: "#app".to_string(),
            live_path: Some("/live".to_string()),
            default_locale: FALLBACK_LOCALE.to_string(),
        }
    }

    pub fn with_config(mut self, config: &WebConfig) -> Self {
        self.mount_selector = config.live.mount_selector.clone();
        self.live_path = config.live.enabled.then(|| config.live.path.clone());
        self.default_locale = config.default_locale.clone();
        self
    }

    pub fn with_not_found(mut self, route: Route) -> Self {
        self.not_found = route;
        self
    }

    pub fn with_locale_resolver(mut self, resolver: Arc<dyn LocaleResolver>) -> Self {
        self.locales = resolver;
        self
    }

    pub fn with_principal_lookup(mut self, lookup: Arc<dyn PrincipalLookup>) -> Self {
        self.principals = lookup;
        self
    }

    pub fn principals(&self) -> &dyn PrincipalLookup {
        self.principals.as_ref()
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Route for `url`, with its captures; the not-found route otherwise.
    pub fn resolve(&self, url: &str) -> (&Route, Option<RouteParams>) {
        match self.routes.route(url) {
            Some(matched) => (matched.value, Some(matched.params)),
            None => (&self.not_found, None),
        }
    }

    pub fn is_streaming(&self, url: &str) -> bool {
        self.resolve(url).0.streaming
    }

    /// Render the full page for one HTTP request into `transport`.
    pub fn render_http(
        &self,
        request: PageRequest,
        transport: impl ResponseTransport + 'static,
    ) -> RenderOutcome {
        let (route, params) = self.resolve(&request.url);
        let mut ctx = Context::request(request.url.as_str(), transport)
            .with_locale(request.locale)
            .with_principal(request.principal)
            .with_form(request.form)
            .with_locale_resolver(Arc::clone(&self.locales));
        match params {
            Some(params) => ctx.set_route(params),
            None => {
                tracing::debug!(url = %request.url, "No route matched");
                if let Some(transport) = ctx.transport_mut() {
                    transport.set_status(NOT_FOUND_STATUS);
                }
            }
        }

        let page = self.shell(route, ctx.locale());
        let outcome = render(&page, &mut ctx);
        match &outcome {
            RenderOutcome::Complete => {}
            RenderOutcome::Aborted(Abort::EarlyTerminate) => {
                tracing::debug!(url = %request.url, "Response handled by component");
            }
            RenderOutcome::Aborted(Abort::Message(message)) => {
                tracing::warn!(
                    url = %request.url,
                    kind = message.kind(),
                    "Message abort outside a live session, ending response"
                );
            }
        }
        outcome
    }

    fn shell(&self, route: &Route, locale: &str) -> Node {
        let mut body: Vec<Node> = vec![el(format!("main{}", self.mount_selector))
            .children([Node::flush(), route.node.to_node()])
            .into()];
        if let Some(path) = &self.live_path {
            body.push(
                el("script")
                    .attr("src", CLIENT_SCRIPT)
                    .attr("data-live", path.as_str())
                    .into(),
            );
        }

        Node::fragment([
            Node::raw("<!DOCTYPE html>"),
            el("html")
                .attr("lang", locale)
                .children([
                    el("head").children([
                        el("meta").attr("charset", "utf-8"),
                        el("meta")
                            .attr("name", "viewport")
                            .attr("content", "width=device-width, initial-scale=1"),
                        el("title").child(route.title.clone()),
                        el("meta")
                            .attr("name", "description")
                            .attr("content", route.description.clone()),
                        el("style").child(Node::raw(ERROR_STYLE)),
                    ]),
                    el("body").children(body),
                ])
                .into(),
        ])
    }

    /// Handle one inbound message of a live session.
    pub fn handle_client_message(
        &self,
        session: &Arc<LiveSession>,
        principal: Option<Principal>,
        message: ClientMessage,
    ) {
        match message {
            ClientMessage::Mount { url, locale } => {
                tracing::debug!(session = %session.id(), url = %url, "Live session mounted");
                session.set_url(url);
                if let Some(locale) = locale {
                    session.set_locale(locale);
                }
            }
            ClientMessage::Navigate { url } => {
                session.set_url(url.as_str());
                self.render_live(session, principal, &url, HashMap::new(), true);
            }
            ClientMessage::Event { url, form } => {
                self.render_live(session, principal, &url, form, false);
            }
        }
    }

    /// Navigation patches the mount element and the title. Event passes keep
    /// the session url and discard the markup; components patch the page
    /// through the session themselves.
    fn render_live(
        &self,
        session: &Arc<LiveSession>,
        principal: Option<Principal>,
        url: &str,
        form: HashMap<String, String>,
        navigate: bool,
    ) {
        let (route, params) = self.resolve(url);
        let mut ctx = Context::live(Arc::clone(session))
            .with_url(url)
            .with_principal(principal)
            .with_form(form)
            .with_locale_resolver(Arc::clone(&self.locales));
        if let Some(params) = params {
            ctx.set_route(params);
        }

        match render_to_string(&route.node.to_node(), &mut ctx) {
            Ok(html) if navigate => {
                let title = ctx.resolve_locale(&route.title);
                session.send(WireMessage::batch([
                    WireMessage::update_in(self.mount_selector.as_str(), html),
                    WireMessage::update_text("title", title),
                ]));
            }
            Ok(_) => {}
            Err(Abort::EarlyTerminate) => {
                tracing::debug!(session = %session.id(), url, "Live pass terminated early");
            }
            Err(Abort::Message(message)) => {
                session.send(message);
            }
        }
    }
}

/// First language of `Accept-Language`, or `default`.
pub fn locale_from_headers(headers: &HeaderMap, default: &str) -> String {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|tag| tag.split(';').next().unwrap_or_default().trim())
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use trellis_core::{BufferedResponse, ComponentError};

    fn app() -> App {
        let routes = Router::new()
            .with(
                "/",
                Route::new(
                    LocaleText::new().with("en", "Home").with("zh_hk", "主頁"),
                    el("h1").child("Welcome"),
                )
                .description("Landing page"),
            )
            .with(
                "/users/:id",
                Route::new(
                    "User",
                    RouteNode::dynamic(|ctx| {
                        Node::text(format!("user {}", ctx.param("id").unwrap_or("?")))
                    }),
                ),
            )
            .with(
                "/fail",
                Route::new(
                    "Fail",
                    component(|_, _| Err(ComponentError::msg("boom"))),
                )
                .streaming(false),
            );
        App::new(routes)
    }

    fn request(url: &str, locale: &str) -> PageRequest {
        PageRequest {
            url: url.to_string(),
            locale: locale.to_string(),
            ..PageRequest::default()
        }
    }

    #[test]
    fn test_page_shell() {
        let response = BufferedResponse::new();
        let outcome = app().render_http(request("/", "zh_hk"), response.clone());
        assert!(outcome.is_complete());

        let state = response.snapshot();
        assert_eq!(state.status, 200);
        assert!(state.body.starts_with("<!DOCTYPE html><html lang=\"zh_hk\"><head>"));
        assert!(state.body.contains("<title>主頁</title>"));
        assert!(state.body.contains(r#"<meta name="description" content="Landing page">"#));
        assert!(state.body.contains(concat!(
            r#"<main id="app"><h1>Welcome</h1></main>"#,
            r#"<script src="/live.js" data-live="/live"></script>"#
        )));
        assert!(state.body.ends_with("</body></html>"));
    }

    #[test]
    fn test_not_found_status() {
        let response = BufferedResponse::new();
        app().render_http(request("/missing", "en"), response.clone());
        let state = response.snapshot();
        assert_eq!(state.status, 404);
        assert!(state.body.contains("Page not found"));
    }

    #[test]
    fn test_route_failure_sets_status() {
        let response = BufferedResponse::new();
        app().render_http(request("/fail", "en"), response.clone());
        let state = response.snapshot();
        assert_eq!(state.status, 500);
        assert!(state.body.contains(r#"<p class="error">boom</p>"#));
    }

    #[test]
    fn test_live_navigate_patches_mount_and_title() {
        let app = app();
        let (session, mut rx) = LiveSession::channel("/");
        app.handle_client_message(
            &session,
            None,
            ClientMessage::Navigate {
                url: "/users/7".to_string(),
            },
        );

        assert_eq!(session.url(), "/users/7");
        assert_eq!(
            rx.try_recv().unwrap(),
            WireMessage::batch([
                WireMessage::update_in("#app", "user 7"),
                WireMessage::update_text("title", "User"),
            ])
        );
    }

    #[test]
    fn test_live_event_keeps_session_url() {
        let app = app();
        let (session, mut rx) = LiveSession::channel("/");
        app.handle_client_message(
            &session,
            None,
            ClientMessage::Event {
                url: "/users/7".to_string(),
                form: HashMap::new(),
            },
        );
        assert_eq!(session.url(), "/");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_live_mount_records_locale() {
        let (session, _rx) = LiveSession::channel("/");
        app().handle_client_message(
            &session,
            None,
            ClientMessage::Mount {
                url: "/stats".to_string(),
                locale: Some("zh_hk".to_string()),
            },
        );
        assert_eq!(session.url(), "/stats");
        assert_eq!(session.locale(), "zh_hk");
    }

    #[test]
    fn test_locale_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(locale_from_headers(&headers, "en"), "en");
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-HK,zh;q=0.9,en;q=0.8"),
        );
        assert_eq!(locale_from_headers(&headers, "en"), "zh-HK");
    }
}
