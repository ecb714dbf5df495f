//! Viewer lookup seam.

use axum::http::{HeaderMap, HeaderName};
use trellis_core::Principal;

/// Maps request headers to the authenticated viewer, if any.
pub trait PrincipalLookup: Send + Sync {
    fn lookup(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Every request is anonymous.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuth;

impl PrincipalLookup for NoAuth {
    fn lookup(&self, _headers: &HeaderMap) -> Option<Principal> {
        None
    }
}

/// Trusts a username header set by an authenticating reverse proxy.
#[derive(Debug, Clone)]
pub struct ProxyHeaderAuth {
    header: HeaderName,
}

impl ProxyHeaderAuth {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Default for ProxyHeaderAuth {
    fn default() -> Self {
        Self::new(HeaderName::from_static("x-forwarded-user"))
    }
}

impl PrincipalLookup for ProxyHeaderAuth {
    fn lookup(&self, headers: &HeaderMap) -> Option<Principal> {
        let username = headers.get(&self.header)?.to_str().ok()?.trim();
        if username.is_empty() {
            return None;
        }
        Some(Principal {
            id: username.to_string(),
            username: username.to_string(),
        })
    }
}
