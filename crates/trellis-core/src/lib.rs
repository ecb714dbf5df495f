//! Node trees rendered in three delivery modes.
//!
//! The same component logic runs as a static pre-render, as a one-shot
//! request/response pass, or inside a live session that receives
//! incremental [`WireMessage`] patches.
//!
//! ```
//! use trellis_core::{el, render_to_string, Context, Node};
//!
//! let mut ctx = Context::new_static("en");
//! let node: Node = el("div#main.card").attr("hidden", false).child("hello & world").into();
//! let html = render_to_string(&node, &mut ctx).unwrap();
//! assert_eq!(html, r#"<div id="main" class="card">hello &amp; world</div>"#);
//! ```

pub mod context;
pub mod error;
pub mod helpers;
pub mod locale;
pub mod node;
pub mod render;
pub mod router;
pub mod selector;
pub mod session;

pub use context::{
    BufferedResponse, Context, ContextKind, Principal, ResponseState, ResponseTransport,
};
pub use error::{
    error_block, Abort, ComponentError, RenderOutcome, DEFAULT_ERROR_STATUS, ERROR_STYLE,
};
pub use helpers::{class_names, concat_class_names, inline_camel_case_style, inline_style};
pub use locale::{locale_text, DefaultLocaleResolver, LocaleResolver, LocaleText, FALLBACK_LOCALE};
pub use node::{
    component, el, AttributeValue, Attributes, Component, ComponentKind, Element, Node, Props,
};
pub use render::{escape_attribute, escape_text, prerender, render, render_to_string};
pub use router::{
    link, parse_urlencoded, redirect, switch, LinkAttrs, Redirect, RouteMatch, RouteParams,
    Router,
};
pub use selector::{Selector, SelectorError};
pub use session::{LiveSession, SessionId, SessionRegistry, WireSink};
pub use trellis_protocol::{AttrPatch, ClientMessage, WireMessage};
