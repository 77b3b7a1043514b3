//! The transport contract consumed by the MCP session protocol engine
//! (§4.2). Concrete bindings (stdio, HTTP+SSE, streaming HTTP) are
//! deliberately not implemented here — see the crate root docs in
//! SPEC_FULL.md §1 for the scope boundary. `memory` provides an in-memory
//! duplex pair for exercising the engine in tests.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{TransportError, TransportResult};
pub use memory::MemoryTransport;
pub use traits::{Transport, TransportState};
