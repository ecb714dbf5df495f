//! HTTP and live-session server for trellis pages.
//!
//! Pages are rendered per request by [`App`], either streamed in chunks or
//! buffered whole. A websocket endpoint keeps a [`trellis_core::LiveSession`]
//! per open tab and patches the page in place on navigation and form events.

pub mod app;
pub mod auth;
pub mod cli;
pub mod demo;
pub mod routes;
pub mod server;
pub mod stream;

mod assets;
mod error;

pub use app::{App, PageRequest, Route, RouteNode};
pub use auth::{NoAuth, PrincipalLookup, ProxyHeaderAuth};
pub use error::{Result, WebError};
pub use server::{build_router, start_server, AppState};
pub use trellis_config::WebConfig;
