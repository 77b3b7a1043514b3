//! Session configuration captured by the builder and read by the session
//! engine. Grounded on `turbomcp-client/src/client/config.rs`'s connection
//! config struct; trimmed of the teacher's plugin/middleware/LLM-provider
//! fields, which have no counterpart in this engine.

use std::time::Duration;

use mcp_wire::types::ClientCapabilities;
use mcp_wire::ClientInfo;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Static configuration for a session, assembled by `ClientBuilder::build`
/// and never mutated afterward.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub request_timeout: Duration,
    pub client_info: ClientInfo,
    /// `None` means "derive from registered roots/sampling handler at build
    /// time"; `Some` is an explicit override (§6, §9).
    pub capabilities_override: Option<ClientCapabilities>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client_info: ClientInfo {
                name: "mcp-client".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities_override: None,
        }
    }
}
