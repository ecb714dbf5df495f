//! Live sessions and the registry used to reach them.
//!
//! A [`LiveSession`] stands for one open duplex connection of one page
//! instance. The [`SessionRegistry`] tracks every open session so that a
//! render pass (or a background task) can push wire messages to other pages.
//! Entries are added and removed only by the connection lifecycle.

use crate::locale::FALLBACK_LOCALE;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use trellis_protocol::WireMessage;
use uuid::Uuid;

/// Identifier of one live session. A reconnect always gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "live-{}", self.0)
    }
}

/// Outbound half of a duplex connection.
pub trait WireSink: Send + Sync {
    /// Hand `message` to the connection. Returns false when the connection is
    /// gone.
    fn deliver(&self, message: WireMessage) -> bool;
}

impl WireSink for mpsc::UnboundedSender<WireMessage> {
    fn deliver(&self, message: WireMessage) -> bool {
        self.send(message).is_ok()
    }
}

pub struct LiveSession {
    id: SessionId,
    url: RwLock<String>,
    locale: RwLock<String>,
    sink: Mutex<Option<Box<dyn WireSink>>>,
}

impl LiveSession {
    pub fn new(url: impl Into<String>, sink: impl WireSink + 'static) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::new(),
            url: RwLock::new(url.into()),
            locale: RwLock::new(FALLBACK_LOCALE.to_string()),
            sink: Mutex::new(Some(Box::new(sink))),
        })
    }

    /// Session backed by an unbounded channel; the receiver feeds the socket.
    pub fn channel(url: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<WireMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(url, tx), rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Last known page path.
    pub fn url(&self) -> String {
        self.url.read().clone()
    }

    pub fn set_url(&self, url: impl Into<String>) {
        *self.url.write() = url.into();
    }

    pub fn locale(&self) -> String {
        self.locale.read().clone()
    }

    pub fn set_locale(&self, locale: impl Into<String>) {
        *self.locale.write() = locale.into();
    }

    /// Send one message. Messages to a closed session are dropped.
    pub fn send(&self, message: WireMessage) -> bool {
        let sink = self.sink.lock();
        match sink.as_ref() {
            Some(sink) => {
                let delivered = sink.deliver(message);
                if !delivered {
                    tracing::debug!(session = %self.id, "Connection gone, message dropped");
                }
                delivered
            }
            None => {
                tracing::trace!(
                    session = %self.id,
                    kind = message.kind(),
                    "Session closed, message dropped"
                );
                false
            }
        }
    }

    /// Release the connection. Once this returns no further message reaches
    /// the client.
    pub fn close(&self) {
        self.sink.lock().take();
    }

    pub fn is_open(&self) -> bool {
        self.sink.lock().is_some()
    }
}

impl fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.id)
            .field("url", &*self.url.read())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Open sessions keyed by id.
///
/// Iteration works on a snapshot, so sessions may register or unregister
/// while a broadcast runs. A session unregistered mid-iteration is closed
/// first and then skipped.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<LiveSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: Arc<LiveSession>) {
        tracing::debug!(session = %session.id(), url = %session.url(), "Registering live session");
        self.sessions.write().insert(session.id(), session);
    }

    /// Remove and close a session. Unknown ids are ignored.
    pub fn unregister(&self, id: SessionId) -> Option<Arc<LiveSession>> {
        let removed = self.sessions.write().remove(&id);
        if let Some(session) = &removed {
            session.close();
            tracing::debug!(session = %id, "Unregistered live session");
        }
        removed
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<LiveSession>> {
        self.sessions.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<LiveSession>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Run `action` on every open session accepted by `predicate`. Returns
    /// how many sessions were visited.
    pub fn for_each<P, A>(&self, predicate: P, mut action: A) -> usize
    where
        P: Fn(&LiveSession) -> bool,
        A: FnMut(&Arc<LiveSession>),
    {
        let mut visited = 0;
        for session in self.snapshot() {
            if !session.is_open() || !predicate(&session) {
                continue;
            }
            action(&session);
            visited += 1;
        }
        visited
    }

    /// Send `message` to every session accepted by `predicate`. Returns how
    /// many sessions received it.
    pub fn broadcast<P>(&self, predicate: P, message: &WireMessage) -> usize
    where
        P: Fn(&LiveSession) -> bool,
    {
        let mut delivered = 0;
        self.for_each(predicate, |session| {
            if session.send(message.clone()) {
                delivered += 1;
            }
        });
        delivered
    }

    /// Broadcast to sessions on the page at `prefix` or anywhere below it.
    /// `/counter` reaches `/counter/2` and `/counter?x=1` but not `/counterfeit`.
    pub fn broadcast_to_path(&self, prefix: &str, message: &WireMessage) -> usize {
        self.broadcast(|session| path_matches(&session.url(), prefix), message)
    }
}

fn path_matches(url: &str, prefix: &str) -> bool {
    match url.strip_prefix(prefix) {
        Some(rest) => {
            rest.is_empty() || prefix.ends_with('/') || rest.starts_with(['/', '?', '#'])
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert!(SessionId::new().to_string().starts_with("live-"));
    }

    #[test]
    fn test_send_after_close_is_dropped() {
        let (session, mut rx) = LiveSession::channel("/");
        assert!(session.send(WireMessage::eval("a()")));
        session.close();
        assert!(!session.is_open());
        assert!(!session.send(WireMessage::eval("b()")));
        assert_eq!(rx.try_recv().unwrap(), WireMessage::eval("a()"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (session, rx) = LiveSession::channel("/");
        drop(rx);
        assert!(!session.send(WireMessage::eval("x")));
        assert!(session.is_open());
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = SessionRegistry::new();
        let (session, _rx) = LiveSession::channel("/train");
        let id = session.id();
        registry.register(session.clone());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(id).is_some());

        let removed = registry.unregister(id).unwrap();
        assert!(!removed.is_open());
        assert!(registry.is_empty());
        assert!(registry.unregister(id).is_none());
    }

    #[test]
    fn test_broadcast_filters_by_path() {
        let registry = SessionRegistry::new();
        let (train, mut train_rx) = LiveSession::channel("/train-ai");
        let (stats, mut stats_rx) = LiveSession::channel("/stats");
        registry.register(train);
        registry.register(stats);

        let msg = WireMessage::eval("chart.update()");
        assert_eq!(registry.broadcast_to_path("/train-ai", &msg), 1);
        assert_eq!(train_rx.try_recv().unwrap(), msg);
        assert!(stats_rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_to_path_respects_segments() {
        let registry = SessionRegistry::new();
        let mut receivers = Vec::new();
        for url in ["/counter", "/counter/2", "/counter?x=1"] {
            let (session, rx) = LiveSession::channel(url);
            registry.register(session);
            receivers.push(rx);
        }
        let (other, mut other_rx) = LiveSession::channel("/counterfeit");
        registry.register(other);

        let msg = WireMessage::update_text("#count", "3");
        assert_eq!(registry.broadcast_to_path("/counter", &msg), 3);
        for rx in &mut receivers {
            assert_eq!(rx.try_recv().unwrap(), msg);
        }
        assert!(other_rx.try_recv().is_err());

        assert_eq!(registry.broadcast_to_path("/", &msg), 4);
    }

    #[test]
    fn test_unregister_during_iteration_skips_session() {
        let registry = SessionRegistry::new();
        let (first, mut first_rx) = LiveSession::channel("/");
        let (second, mut second_rx) = LiveSession::channel("/");
        let (first_id, second_id) = (first.id(), second.id());
        registry.register(first);
        registry.register(second);

        let msg = WireMessage::update_text("#n", "1");
        let mut delivered = 0;
        registry.for_each(
            |_| true,
            |session| {
                // whichever comes first removes the other
                let other = if session.id() == first_id { second_id } else { first_id };
                registry.unregister(other);
                if session.send(msg.clone()) {
                    delivered += 1;
                }
            },
        );

        assert_eq!(delivered, 1);
        let received = first_rx.try_recv().is_ok() as usize + second_rx.try_recv().is_ok() as usize;
        assert_eq!(received, 1);
        assert_eq!(registry.len(), 1);
    }
}
