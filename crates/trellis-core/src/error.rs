//! Component failures and how a render pass recovers from them.

use crate::context::{Context, ContextKind};
use crate::node::{el, Node};
use crate::render::escape_text;
use crate::selector::SelectorError;
use thiserror::Error;
use trellis_protocol::WireMessage;

/// Status used when a failure does not carry its own.
pub const DEFAULT_ERROR_STATUS: u16 = 500;

/// Style for the inline `p.error` block.
pub const ERROR_STYLE: &str = r#"
.error {
  border: 1px solid red;
  padding: 0.75rem;
  width: fit-content;
}
"#;

/// Failure raised by a component function.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The response was fully handled elsewhere; stop this pass.
    #[error("Early terminate")]
    Terminate,

    /// Stop this pass and deliver `message` instead of markup.
    #[error("Message exception: {}", .0.kind())]
    Message(WireMessage),

    /// Render this node in place of the component and keep going.
    #[error("Recoverable render error")]
    Node(Node),

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComponentError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Other(anyhow::anyhow!("{message}"))
    }

    /// Status to answer with when headers are still unsent.
    pub fn status_code(&self) -> u16 {
        match self {
            ComponentError::Http { status, .. } => *status,
            ComponentError::Validation(_) => 400,
            _ => DEFAULT_ERROR_STATUS,
        }
    }
}

/// Why a render pass stopped early.
#[derive(Debug, Clone, PartialEq)]
pub enum Abort {
    /// The response was already fully handled.
    EarlyTerminate,
    /// A message should be delivered instead of the rendered output.
    Message(WireMessage),
}

/// Result of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Complete,
    Aborted(Abort),
}

impl RenderOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, RenderOutcome::Complete)
    }
}

impl From<Result<(), Abort>> for RenderOutcome {
    fn from(result: Result<(), Abort>) -> Self {
        match result {
            Ok(()) => RenderOutcome::Complete,
            Err(abort) => RenderOutcome::Aborted(abort),
        }
    }
}

/// The inline error block.
pub fn error_block(content: impl Into<Node>) -> Node {
    el("p.error").child(content).into()
}

/// Map a component failure to the node rendered in its place, or abort.
pub(crate) fn recover(error: ComponentError, ctx: &mut Context) -> Result<Node, Abort> {
    let error = match error {
        ComponentError::Terminate => return Err(Abort::EarlyTerminate),
        ComponentError::Message(message) => return Err(Abort::Message(message)),
        ComponentError::Node(node) => return Ok(error_block(node)),
        other => other,
    };

    tracing::error!(url = %ctx.url(), error = %error, "Caught error from component");

    match ctx.kind() {
        ContextKind::LiveSession => {
            let text = escape_text(&error.to_string()).into_owned();
            if !ctx.send(WireMessage::show_error(text)) {
                tracing::warn!(url = %ctx.url(), "Could not deliver error to live session");
            }
            Err(Abort::EarlyTerminate)
        }
        ContextKind::RequestResponse => {
            let status = error.status_code();
            if let Some(transport) = ctx.transport_mut() {
                if !transport.headers_sent() {
                    transport.set_status(status);
                }
            }
            Ok(error_block(error.to_string()))
        }
        ContextKind::Static => Ok(error_block(error.to_string())),
    }
}
