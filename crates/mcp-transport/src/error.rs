//! Transport-level error type.

use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors a `Transport` implementation can report. Distinct from
/// `mcp_wire::Error`: this is the narrower, `thiserror`-derived vocabulary
/// of things that can go wrong moving bytes across a pipe, not the
/// engine's broader session-level error space.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationFailed(err.to_string())
    }
}

impl From<TransportError> for mcp_wire::Error {
    fn from(err: TransportError) -> Self {
        use mcp_wire::ErrorKind;

        let kind = match &err {
            TransportError::SerializationFailed(_) | TransportError::ProtocolError(_) => {
                ErrorKind::Protocol
            }
            _ => ErrorKind::Transport,
        };
        mcp_wire::Error::new(kind, err.to_string()).with_component("transport")
    }
}

impl From<mcp_wire::Error> for TransportError {
    fn from(err: mcp_wire::Error) -> Self {
        use mcp_wire::ErrorKind;

        match err.kind {
            ErrorKind::Transport => TransportError::ConnectionFailed(err.message),
            ErrorKind::Protocol => TransportError::ProtocolError(err.message),
            _ => TransportError::Internal(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_transport_kind_by_default() {
        let wire: mcp_wire::Error = TransportError::ConnectionLost("eof".into()).into();
        assert_eq!(wire.kind, mcp_wire::ErrorKind::Transport);
    }

    #[test]
    fn serialization_failures_map_to_protocol_kind() {
        let wire: mcp_wire::Error = TransportError::SerializationFailed("bad json".into()).into();
        assert_eq!(wire.kind, mcp_wire::ErrorKind::Protocol);
    }
}
