//! The protocol-level error type shared by the correlator, dispatcher, and
//! session engine.
//!
//! Distinct from `mcp_transport::TransportError`, which is a `thiserror`
//! enum owned by the transport-contract crate; this type is hand-rolled
//! (not derive-based) so the two error layers read differently on purpose,
//! matching the split the rest of this stack draws between wire-level and
//! transport-level failures. `mcp_transport::TransportError` converts into
//! this type at the boundary; see that crate's `From` impl.

use std::fmt;

use serde_json::Value;
use uuid::Uuid;

use crate::jsonrpc::JsonRpcErrorCode;

/// The seven error kinds named by the session engine's error handling
/// design: transport, protocol, application, timeout, cancellation,
/// pre-flight, and handler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The transport pipe is broken; terminal for the session.
    Transport,
    /// A malformed envelope, unknown method, or invalid params.
    Protocol,
    /// The server replied with a JSON-RPC error.
    Application,
    /// An awaiter's deadline passed before a response arrived.
    Timeout,
    /// The caller or a shutdown cancelled a pending awaiter.
    Cancelled,
    /// A capability or session-state precondition failed before any wire
    /// traffic was sent.
    PreFlight,
    /// A server-initiated request handler raised an error.
    Handler,
}

impl ErrorKind {
    /// Maps this kind to the JSON-RPC numeric code used whenever the
    /// dispatcher needs to write an `ErrorResponse` for it (§4.4, §7).
    pub const fn jsonrpc_error_code(self) -> JsonRpcErrorCode {
        match self {
            Self::Protocol => JsonRpcErrorCode::InvalidRequest,
            Self::Handler => JsonRpcErrorCode::InternalError,
            Self::Transport => JsonRpcErrorCode::ServerError(-32000),
            Self::Timeout => JsonRpcErrorCode::ServerError(-32001),
            Self::Cancelled => JsonRpcErrorCode::ServerError(-32002),
            Self::PreFlight => JsonRpcErrorCode::ServerError(-32003),
            Self::Application => JsonRpcErrorCode::InternalError,
        }
    }

    /// Whether this kind represents a terminal, session-ending condition.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Transport)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Application => "application",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::PreFlight => "pre-flight",
            Self::Handler => "handler",
        };
        f.write_str(s)
    }
}

/// Additional context attached to an `Error` via the builder methods below.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub component: Option<String>,
    pub method: Option<String>,
    pub request_id: Option<String>,
    /// When this error was constructed, for correlating a failure reported
    /// to a caller with the log line the dispatcher or correlator emitted
    /// for the same event.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            component: None,
            method: None,
            request_id: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// The engine's error type. Carries an id for correlating log lines to a
/// specific failure, the kind used for wire-code mapping and propagation
/// decisions, a human message, optional structured `data` (mirroring the
/// JSON-RPC error's `data` member for application errors), and free-form
/// context.
#[derive(Debug, Clone)]
pub struct Error {
    pub id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub context: ErrorContext,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            data: None,
            context: ErrorContext::default(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    pub fn application(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        let mut err = Self::new(ErrorKind::Application, message);
        err.data = data;
        err.context.request_id = Some(code.to_string());
        err
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn pre_flight(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreFlight, message)
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Handler, message)
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.context.component = Some(component.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.context.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.context.request_id = Some(request_id.into());
        self
    }

    pub fn jsonrpc_error_code(&self) -> JsonRpcErrorCode {
        self.kind.jsonrpc_error_code()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)?;
        if let Some(method) = &self.context.method {
            write!(f, " (method: {method})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_stable_codes() {
        assert_eq!(ErrorKind::Protocol.jsonrpc_error_code().code(), -32600);
        assert_eq!(ErrorKind::Handler.jsonrpc_error_code().code(), -32603);
    }

    #[test]
    fn builder_methods_attach_context() {
        let err = Error::timeout("deadline passed").with_method("ping");
        assert_eq!(err.context.method.as_deref(), Some("ping"));
        assert!(err.to_string().contains("timeout error"));
    }

    #[test]
    fn transport_errors_are_terminal() {
        assert!(Error::transport("broken pipe").is_terminal());
        assert!(!Error::timeout("slow").is_terminal());
    }
}
