//! Response transport bridging a blocking render pass to an axum body.
//!
//! The pass writes into a buffer. The response head is released on the first
//! flush of a streaming route, on a redirect, or when the pass ends; buffered
//! markup then follows as body chunks.

use tokio::sync::{mpsc, oneshot};
use trellis_core::ResponseTransport;

/// Status line and redirect target, decided before the first body chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub location: Option<String>,
}

pub struct StreamingResponse {
    head: Option<oneshot::Sender<ResponseHead>>,
    body: mpsc::UnboundedSender<String>,
    status: u16,
    buffer: String,
    streaming: bool,
}

/// Receiving ends handed to the async request handler.
pub struct ResponseChannels {
    pub head: oneshot::Receiver<ResponseHead>,
    pub body: mpsc::UnboundedReceiver<String>,
}

impl StreamingResponse {
    /// A transport whose flushes only take effect when `streaming` is set.
    pub fn new(streaming: bool) -> (Self, ResponseChannels) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::unbounded_channel();
        let transport = Self {
            head: Some(head_tx),
            body: body_tx,
            status: 200,
            buffer: String::new(),
            streaming,
        };
        (
            transport,
            ResponseChannels {
                head: head_rx,
                body: body_rx,
            },
        )
    }

    fn send_head(&mut self, location: Option<String>) {
        if let Some(tx) = self.head.take() {
            let head = ResponseHead {
                status: self.status,
                location,
            };
            if tx.send(head).is_err() {
                tracing::debug!("Client went away before response head");
            }
        }
    }

    fn send_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let chunk = std::mem::take(&mut self.buffer);
        if self.body.send(chunk).is_err() {
            tracing::debug!("Client went away, dropping body chunk");
        }
    }
}

impl ResponseTransport for StreamingResponse {
    fn headers_sent(&self) -> bool {
        self.head.is_none()
    }

    fn set_status(&mut self, status: u16) {
        if self.head.is_some() {
            self.status = status;
        }
    }

    fn redirect(&mut self, status: u16, location: &str) {
        if self.head.is_none() {
            tracing::warn!(location, "Redirect after headers were sent");
            return;
        }
        self.status = status;
        self.buffer.clear();
        self.send_head(Some(location.to_string()));
    }

    fn write(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
    }

    fn flush(&mut self) {
        if !self.streaming {
            return;
        }
        self.send_head(None);
        self.send_buffer();
    }
}

impl Drop for StreamingResponse {
    fn drop(&mut self) {
        self.send_head(None);
        self.send_buffer();
    }
}
