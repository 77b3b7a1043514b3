//! The MCP client-side session protocol engine.
//!
//! Ties the correlator (C3), dispatcher (C4), handler registry (C6), and
//! session engine (C5, C7) together into `ClientBuilder` / `Client` /
//! `SyncClient`. See `SPEC_FULL.md` for the full component breakdown this
//! module layout mirrors.

pub mod client;
pub mod correlator;
pub mod dispatcher;
pub mod handlers;

pub use client::builder::ClientBuilder;
pub use client::config::ClientConfig;
pub use client::core::{Client, SessionState};
pub use client::sync::SyncClient;
pub use correlator::{Correlator, Outcome, SharedCorrelator};
pub use dispatcher::{Dispatcher, NotificationHandlerFn, RequestHandlerFn};
pub use handlers::{
    HandlerRegistry, LoggingConsumer, ProgressConsumer, PromptsChangeConsumer,
    ResourceUpdateConsumer, ResourcesChangeConsumer, RootsMap, SamplingHandler,
    ToolsChangeConsumer,
};
