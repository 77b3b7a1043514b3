//! The transport contract consumed by the session engine (§4.2).
//!
//! Three operations: `connect`, `send`, `close`, plus a pull-based
//! `receive` that realizes the "inbound sink" the spec describes — the
//! dispatcher's single inbound task is the one caller of `receive`, so
//! pulling from it in a loop delivers envelopes in arrival order exactly
//! as a push-based sink would, without requiring the transport to own a
//! task of its own.
//!
//! Hand-rolled boxed futures (rather than `async fn` in the trait) keep
//! this trait object-safe: the session holds an `Arc<dyn Transport>`
//! without committing to one concrete transport type.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use mcp_wire::jsonrpc::JsonRpcMessage;

use crate::error::TransportResult;

/// Current lifecycle state of a transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Failed { reason: String },
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A bidirectional, framed message pipe. Concrete bindings (stdio, HTTP+SSE,
/// streaming HTTP) are out of scope for this crate; only the contract lives
/// here, plus an in-memory pair for tests (see `mcp_transport::memory`).
pub trait Transport: Send + Sync + Debug {
    /// Establishes the connection. Completes once the transport is ready to
    /// `send`/`receive`. Ordering guarantee: once connected, inbound
    /// delivery via `receive` is strictly sequential.
    fn connect(&self) -> BoxFuture<'_, TransportResult<()>>;

    /// Hands an envelope to the wire. Completes once the envelope has been
    /// written. Failures are terminal for the session (§4.2).
    fn send(&self, message: JsonRpcMessage) -> BoxFuture<'_, TransportResult<()>>;

    /// Pulls the next inbound envelope, in arrival order. Returns `Ok(None)`
    /// when the transport has been closed with no further messages pending.
    fn receive(&self) -> BoxFuture<'_, TransportResult<Option<JsonRpcMessage>>>;

    /// Drains and releases resources. Completes once fully closed.
    fn close(&self) -> BoxFuture<'_, TransportResult<()>>;

    /// Current lifecycle state, for the dispatcher's fatal-vs-transient
    /// error classification.
    fn state(&self) -> TransportState;
}

#[cfg(test)]
mod object_safety {
    use super::*;

    fn _assert_object_safe(_: &dyn Transport) {}
}
