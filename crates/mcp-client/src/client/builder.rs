//! The single configuration surface (§6), grounded on
//! `turbomcp-client/src/builder.rs`'s fluent `ClientBuilder`. The teacher's
//! plugin registry, Tower middleware stack, LLM-provider wiring, and
//! `SessionManager` integration have no counterpart in this engine and are
//! not carried over (see DESIGN.md).

use std::sync::Arc;
use std::time::Duration;

use mcp_transport::Transport;
use mcp_wire::types::{ClientCapabilities, Root, RootsCapability, SamplingCapability};
use mcp_wire::ClientInfo;

use crate::client::config::ClientConfig;
use crate::client::core::Client;
use crate::handlers::{
    HandlerRegistry, LoggingConsumer, ProgressConsumer, PromptsChangeConsumer,
    ResourceUpdateConsumer, ResourcesChangeConsumer, RootsMap, SamplingHandler,
    ToolsChangeConsumer,
};

/// Builds a `Client<T>`. `transport` is the only required option; every
/// other field has the default named in §6.
pub struct ClientBuilder<T: Transport + 'static> {
    transport: Arc<T>,
    config: ClientConfig,
    roots: Vec<Root>,
    sampling_handler: Option<Arc<dyn SamplingHandler>>,
    tools_consumers: Vec<Arc<dyn ToolsChangeConsumer>>,
    resources_consumers: Vec<Arc<dyn ResourcesChangeConsumer>>,
    prompts_consumers: Vec<Arc<dyn PromptsChangeConsumer>>,
    resource_update_consumers: Vec<(String, Arc<dyn ResourceUpdateConsumer>)>,
    progress_consumers: Vec<(String, Arc<dyn ProgressConsumer>)>,
    logging_consumers: Vec<Arc<dyn LoggingConsumer>>,
}

impl<T: Transport + 'static> ClientBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            config: ClientConfig::default(),
            roots: Vec::new(),
            sampling_handler: None,
            tools_consumers: Vec::new(),
            resources_consumers: Vec::new(),
            prompts_consumers: Vec::new(),
            resource_update_consumers: Vec::new(),
            progress_consumers: Vec::new(),
            logging_consumers: Vec::new(),
        }
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn client_info(mut self, client_info: ClientInfo) -> Self {
        self.config.client_info = client_info;
        self
    }

    /// Overrides capability derivation entirely (§9 open question: derived
    /// by default, explicit override available for e.g. `experimental`).
    #[must_use]
    pub fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.config.capabilities_override = Some(capabilities);
        self
    }

    /// Registers a root. Re-registering an existing `uri` is last-write-wins
    /// (§9), resolved by `RootsMap::insert`.
    #[must_use]
    pub fn root(mut self, root: Root) -> Self {
        self.roots.push(root);
        self
    }

    #[must_use]
    pub fn sampling_handler(mut self, handler: Arc<dyn SamplingHandler>) -> Self {
        self.sampling_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn tools_change_consumer(mut self, consumer: Arc<dyn ToolsChangeConsumer>) -> Self {
        self.tools_consumers.push(consumer);
        self
    }

    #[must_use]
    pub fn resources_change_consumer(mut self, consumer: Arc<dyn ResourcesChangeConsumer>) -> Self {
        self.resources_consumers.push(consumer);
        self
    }

    #[must_use]
    pub fn prompts_change_consumer(mut self, consumer: Arc<dyn PromptsChangeConsumer>) -> Self {
        self.prompts_consumers.push(consumer);
        self
    }

    #[must_use]
    pub fn resource_update_consumer(
        mut self,
        uri: impl Into<String>,
        consumer: Arc<dyn ResourceUpdateConsumer>,
    ) -> Self {
        self.resource_update_consumers.push((uri.into(), consumer));
        self
    }

    #[must_use]
    pub fn progress_consumer(
        mut self,
        progress_token: impl Into<String>,
        consumer: Arc<dyn ProgressConsumer>,
    ) -> Self {
        self.progress_consumers.push((progress_token.into(), consumer));
        self
    }

    #[must_use]
    pub fn logging_consumer(mut self, consumer: Arc<dyn LoggingConsumer>) -> Self {
        self.logging_consumers.push(consumer);
        self
    }

    /// Assembles the handler registry and derives (or accepts the override
    /// for) client capabilities, then constructs the session engine. Does
    /// not connect the transport — call `Client::initialize` for that.
    pub fn build(self) -> Arc<Client<T>> {
        let mut roots_map = RootsMap::default();
        for root in self.roots {
            roots_map.insert(root);
        }
        let has_roots = !roots_map.is_empty();
        let has_sampling = self.sampling_handler.is_some();

        let mut resource_update_by_uri: std::collections::HashMap<_, Vec<_>> =
            std::collections::HashMap::new();
        for (uri, consumer) in self.resource_update_consumers {
            resource_update_by_uri.entry(uri).or_default().push(consumer);
        }
        let mut progress_by_token: std::collections::HashMap<_, Vec<_>> =
            std::collections::HashMap::new();
        for (token, consumer) in self.progress_consumers {
            progress_by_token.entry(token).or_default().push(consumer);
        }

        let registry = Arc::new(HandlerRegistry {
            roots: parking_lot::RwLock::new(roots_map),
            sampling_handler: parking_lot::RwLock::new(self.sampling_handler),
            tools_consumers: parking_lot::RwLock::new(self.tools_consumers),
            resources_consumers: parking_lot::RwLock::new(self.resources_consumers),
            prompts_consumers: parking_lot::RwLock::new(self.prompts_consumers),
            resource_update_consumers: parking_lot::RwLock::new(resource_update_by_uri),
            logging_consumers: parking_lot::RwLock::new(self.logging_consumers),
            progress_consumers: parking_lot::RwLock::new(progress_by_token),
        });

        let client_capabilities = self.config.capabilities_override.clone().unwrap_or_else(|| {
            ClientCapabilities {
                roots: has_roots.then_some(RootsCapability { list_changed: Some(true) }),
                sampling: has_sampling.then_some(SamplingCapability {}),
                experimental: None,
            }
        });

        Client::new(self.transport, self.config, registry, client_capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_transport::MemoryTransport;

    #[tokio::test]
    async fn capabilities_are_derived_from_registered_roots_and_sampling() {
        struct NoopSampling;
        #[async_trait::async_trait]
        impl SamplingHandler for NoopSampling {
            async fn handle_create_message(
                &self,
                _request: mcp_wire::types::CreateMessageRequest,
            ) -> Result<mcp_wire::types::CreateMessageResult, mcp_wire::Error> {
                unimplemented!()
            }
        }

        let (transport, _peer) = MemoryTransport::pair();
        let client = ClientBuilder::new(transport)
            .root(Root { uri: "file:///a".into(), name: None })
            .sampling_handler(Arc::new(NoopSampling))
            .build();

        assert!(client.client_capabilities().roots.is_some());
        assert!(client.client_capabilities().sampling.is_some());
    }

    #[tokio::test]
    async fn no_registrations_means_no_optional_capabilities() {
        let (transport, _peer) = MemoryTransport::pair();
        let client = ClientBuilder::new(transport).build();
        assert!(client.client_capabilities().roots.is_none());
        assert!(client.client_capabilities().sampling.is_none());
    }
}
