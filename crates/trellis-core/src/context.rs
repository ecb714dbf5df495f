//! Per-pass render state.
//!
//! A [`Context`] is created for one render pass and owned by it. It carries
//! what every component may read (locale, viewer, matched route, submitted
//! form) and the delivery mode deciding where markup goes and how errors and
//! redirects are surfaced.

use crate::locale::{DefaultLocaleResolver, LocaleResolver, LocaleText, FALLBACK_LOCALE};
use crate::router::RouteParams;
use crate::session::LiveSession;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_protocol::WireMessage;

/// The authenticated viewer, as reported by the host's user lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub username: String,
}

/// One-shot response transport.
///
/// Once headers are sent the status can no longer change.
pub trait ResponseTransport: Send {
    fn headers_sent(&self) -> bool;

    fn set_status(&mut self, status: u16);

    /// Answer with a redirect. Only meaningful while headers are unsent.
    fn redirect(&mut self, status: u16, location: &str);

    fn write(&mut self, chunk: &str);

    /// Deliver buffered output now. Streaming transports send headers on the
    /// first flush.
    fn flush(&mut self);
}

/// Which delivery mode a context renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Static,
    RequestResponse,
    LiveSession,
}

enum Delivery {
    Static,
    RequestResponse(Box<dyn ResponseTransport>),
    LiveSession(Arc<LiveSession>),
}

pub struct Context {
    locale: String,
    url: String,
    principal: Option<Principal>,
    route: Option<RouteParams>,
    form: HashMap<String, String>,
    locales: Arc<dyn LocaleResolver>,
    delivery: Delivery,
    out: String,
    capture: Option<String>,
}

impl Context {
    fn with_delivery(delivery: Delivery) -> Self {
        Self {
            locale: FALLBACK_LOCALE.to_string(),
            url: "/".to_string(),
            principal: None,
            route: None,
            form: HashMap::new(),
            locales: Arc::new(DefaultLocaleResolver),
            delivery,
            out: String::new(),
            capture: None,
        }
    }

    /// Context for pre-rendering markup into a string.
    pub fn new_static(locale: impl Into<String>) -> Self {
        Self::with_delivery(Delivery::Static).with_locale(locale)
    }

    /// Context answering one request through `transport`.
    pub fn request(url: impl Into<String>, transport: impl ResponseTransport + 'static) -> Self {
        Self::with_delivery(Delivery::RequestResponse(Box::new(transport))).with_url(url)
    }

    /// Context rendering for a live session; url and locale come from the
    /// session.
    pub fn live(session: Arc<LiveSession>) -> Self {
        let url = session.url();
        let locale = session.locale();
        Self::with_delivery(Delivery::LiveSession(session))
            .with_url(url)
            .with_locale(locale)
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_form(mut self, form: HashMap<String, String>) -> Self {
        self.form = form;
        self
    }

    pub fn with_locale_resolver(mut self, resolver: Arc<dyn LocaleResolver>) -> Self {
        self.locales = resolver;
        self
    }

    pub fn kind(&self) -> ContextKind {
        match self.delivery {
            Delivery::Static => ContextKind::Static,
            Delivery::RequestResponse(_) => ContextKind::RequestResponse,
            Delivery::LiveSession(_) => ContextKind::LiveSession,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Requested url including its query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn route(&self) -> Option<&RouteParams> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, route: RouteParams) {
        self.route = Some(route);
    }

    /// Captured path parameter of the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route.as_ref()?.param(name)
    }

    pub fn form(&self) -> &HashMap<String, String> {
        &self.form
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    pub fn resolve_locale(&self, text: &LocaleText) -> String {
        self.locales.resolve(text, &self.locale)
    }

    pub fn session(&self) -> Option<&Arc<LiveSession>> {
        match &self.delivery {
            Delivery::LiveSession(session) => Some(session),
            _ => None,
        }
    }

    pub fn transport_mut(&mut self) -> Option<&mut (dyn ResponseTransport + 'static)> {
        match &mut self.delivery {
            Delivery::RequestResponse(transport) => Some(transport.as_mut()),
            _ => None,
        }
    }

    /// False outside request/response delivery.
    pub fn headers_sent(&self) -> bool {
        match &self.delivery {
            Delivery::RequestResponse(transport) => transport.headers_sent(),
            _ => false,
        }
    }

    /// Send to the live session. Returns whether the message was handed to an
    /// open session.
    pub fn send(&self, message: WireMessage) -> bool {
        match &self.delivery {
            Delivery::LiveSession(session) => session.send(message),
            _ => false,
        }
    }

    /// Output collected by static and live passes.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.out)
    }

    pub(crate) fn write(&mut self, chunk: &str) {
        if let Some(buffer) = self.capture.as_mut() {
            buffer.push_str(chunk);
            return;
        }
        match &mut self.delivery {
            Delivery::RequestResponse(transport) => transport.write(chunk),
            Delivery::Static | Delivery::LiveSession(_) => self.out.push_str(chunk),
        }
    }

    /// Flushing only reaches the transport outside captures; static and live
    /// output is delivered whole by the caller.
    pub(crate) fn flush(&mut self) {
        if self.capture.is_some() {
            return;
        }
        if let Delivery::RequestResponse(transport) = &mut self.delivery {
            transport.flush();
        }
    }

    /// Run `f` with output redirected into a fresh buffer.
    pub(crate) fn capture<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> (R, String) {
        let outer = self.capture.replace(String::new());
        let result = f(self);
        let captured = std::mem::replace(&mut self.capture, outer).unwrap_or_default();
        (result, captured)
    }
}

/// Observable state of a [`BufferedResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseState {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
    pub headers_sent: bool,
    pub flushes: usize,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: 200,
            location: None,
            body: String::new(),
            headers_sent: false,
            flushes: 0,
        }
    }
}

/// In-memory transport. Clones share state, so a caller can keep one handle
/// and inspect the response after the pass.
#[derive(Debug, Clone, Default)]
pub struct BufferedResponse {
    state: Arc<Mutex<ResponseState>>,
    streaming: bool,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose flushes send headers, like a chunked response.
    pub fn streaming() -> Self {
        Self {
            streaming: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> ResponseState {
        self.state.lock().clone()
    }
}

impl ResponseTransport for BufferedResponse {
    fn headers_sent(&self) -> bool {
        self.state.lock().headers_sent
    }

    fn set_status(&mut self, status: u16) {
        let mut state = self.state.lock();
        if !state.headers_sent {
            state.status = status;
        }
    }

    fn redirect(&mut self, status: u16, location: &str) {
        let mut state = self.state.lock();
        state.status = status;
        state.location = Some(location.to_string());
        state.headers_sent = true;
    }

    fn write(&mut self, chunk: &str) {
        self.state.lock().body.push_str(chunk);
    }

    fn flush(&mut self) {
        if self.streaming {
            let mut state = self.state.lock();
            state.headers_sent = true;
            state.flushes += 1;
        }
    }
}
