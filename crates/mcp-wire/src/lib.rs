//! Wire schema for the MCP session protocol engine.
//!
//! Defines the JSON-RPC 2.0 envelope types, the closed table of MCP method
//! names, the session entity types (capabilities, tools, resources,
//! prompts, logging, sampling), and the engine's shared error type. Nothing
//! in this crate touches a transport or a runtime; it is pure data plus
//! (de)serialization.

pub mod error;
pub mod jsonrpc;
pub mod methods;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcResponsePayload, JsonRpcVersion, RequestId,
};
pub use types::*;
