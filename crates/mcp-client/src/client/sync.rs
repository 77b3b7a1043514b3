//! The blocking façade (C7): wraps the async session engine for callers on
//! a thread that cannot or does not want to `.await`.
//!
//! Grounded on the method surface of `turbomcp-client/src/shared.rs`
//! (`SharedClient` mirrors every async operation with a blocking variant),
//! but not its implementation: that type drives a call through an
//! `Arc<Mutex<Client>>` and blocks on a channel round-trip to a dedicated
//! worker thread. This façade instead holds a `tokio::runtime::Handle` to
//! the runtime the session is already driven on and blocks the calling
//! thread directly with `Handle::block_on(timeout(requestTimeout, future))`
//! (§4.7) — no lock is held across the wait, and dropping the joined
//! future on elapse triggers the same correlator-side cancellation an
//! async-side timeout would.

use std::sync::Arc;
use std::time::Duration;

use mcp_transport::Transport;
use mcp_wire::types::{
    CallToolResult, CompleteResult, CompletionContext, CompletionReference, GetPromptResult,
    ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
    LoggingLevel, ReadResourceResult,
};
use mcp_wire::Error;
use serde_json::Value;
use tokio::runtime::Handle;

use crate::client::core::Client;

/// A blocking handle onto a `Client<T>`. Every method here is the blocking
/// counterpart of the identically named async method on `Client`.
pub struct SyncClient<T: Transport + 'static> {
    inner: Arc<Client<T>>,
    handle: Handle,
    request_timeout: Duration,
}

impl<T: Transport + 'static> SyncClient<T> {
    /// Wraps an already-initialized `Client`. `handle` must belong to the
    /// runtime that is driving `inner`'s dispatcher and background tasks.
    pub fn new(inner: Arc<Client<T>>, handle: Handle, request_timeout: Duration) -> Self {
        Self { inner, handle, request_timeout }
    }

    fn block_on<F>(&self, future: F) -> Result<F::Output, Error>
    where
        F: std::future::Future,
    {
        self.handle
            .block_on(tokio::time::timeout(self.request_timeout, future))
            .map_err(|_elapsed| Error::timeout("blocking call exceeded requestTimeout"))
    }

    pub fn initialize(&self) -> Result<(), Error> {
        self.block_on(self.inner.initialize())?
    }

    pub fn close(&self) -> Result<(), Error> {
        self.block_on(self.inner.close())?
    }

    pub fn ping(&self) -> Result<(), Error> {
        self.block_on(self.inner.ping())?
    }

    pub fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, Error> {
        self.block_on(self.inner.list_tools(cursor))?
    }

    pub fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, Error> {
        self.block_on(self.inner.call_tool(name, arguments))?
    }

    pub fn list_resources(&self, cursor: Option<String>) -> Result<ListResourcesResult, Error> {
        self.block_on(self.inner.list_resources(cursor))?
    }

    pub fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, Error> {
        self.block_on(self.inner.read_resource(uri))?
    }

    pub fn list_resource_templates(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourceTemplatesResult, Error> {
        self.block_on(self.inner.list_resource_templates(cursor))?
    }

    pub fn subscribe_resource(&self, uri: &str) -> Result<(), Error> {
        self.block_on(self.inner.subscribe_resource(uri))?
    }

    pub fn unsubscribe_resource(&self, uri: &str) -> Result<(), Error> {
        self.block_on(self.inner.unsubscribe_resource(uri))?
    }

    pub fn list_prompts(&self, cursor: Option<String>) -> Result<ListPromptsResult, Error> {
        self.block_on(self.inner.list_prompts(cursor))?
    }

    pub fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<GetPromptResult, Error> {
        self.block_on(self.inner.get_prompt(name, arguments))?
    }

    pub fn set_logging_level(&self, level: LoggingLevel) -> Result<(), Error> {
        self.block_on(self.inner.set_logging_level(level))?
    }

    pub fn complete(
        &self,
        reference: CompletionReference,
        argument_name: &str,
        argument_value: &str,
        context: Option<CompletionContext>,
    ) -> Result<CompleteResult, Error> {
        self.block_on(
            self.inner
                .complete(reference, argument_name, argument_value, context),
        )?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::builder::ClientBuilder;
    use mcp_transport::MemoryTransport;

    #[test]
    fn ping_before_initialize_is_a_preflight_error_not_a_hang() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (transport, _peer) = MemoryTransport::pair();
        let client = runtime.block_on(async { ClientBuilder::new(transport).build() });
        let sync = SyncClient::new(client, runtime.handle().clone(), Duration::from_secs(1));

        let err = sync.ping().unwrap_err();
        assert_eq!(err.kind, mcp_wire::ErrorKind::PreFlight);
    }
}
