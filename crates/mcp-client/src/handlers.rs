//! Notification & request handler surface (C6): traits for the
//! user-registered consumers, and the registry holding them plus the
//! roots map.
//!
//! Grounded on `turbomcp-client/src/handlers.rs` (`RootsHandler`,
//! `LogHandler`, `ResourceUpdateHandler`, `*ListChangedHandler` traits,
//! `#[async_trait]`, a `HandlerRegistry` with `set_*`/`has_*` methods) and
//! `sampling.rs` (`SamplingHandler`). The teacher's registry holds one
//! slot per handler kind (`set_*_handler` overwrites); this generalizes
//! the three list-changed kinds to `Vec<Arc<dyn _>>` multi-registration
//! per §6 ("multi-registration; all are invoked on each event").
//! `ProductionSamplingHandler`'s LLM backend integration is not carried
//! over — sampling handler contents are opaque to the engine (§3).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_wire::types::{CreateMessageRequest, CreateMessageResult, LoggingMessageNotification, Prompt, Resource, Root, Tool};
use mcp_wire::Error;
use parking_lot::RwLock;
use serde_json::Value;

/// Invoked when the server asks this runtime to produce a model
/// completion. Presence of a registered handler is what enables the
/// `sampling` client capability (§3).
#[async_trait]
pub trait SamplingHandler: Send + Sync {
    async fn handle_create_message(
        &self,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResult, Error>;
}

/// Fired with the full refreshed tool list after `notifications/tools/list_changed`.
#[async_trait]
pub trait ToolsChangeConsumer: Send + Sync {
    async fn on_tools_changed(&self, tools: Vec<Tool>);
}

#[async_trait]
pub trait ResourcesChangeConsumer: Send + Sync {
    async fn on_resources_changed(&self, resources: Vec<Resource>);
}

#[async_trait]
pub trait PromptsChangeConsumer: Send + Sync {
    async fn on_prompts_changed(&self, prompts: Vec<Prompt>);
}

/// Fired on `notifications/resources/updated` for a URI this consumer
/// subscribed to.
#[async_trait]
pub trait ResourceUpdateConsumer: Send + Sync {
    async fn on_resource_updated(&self, uri: String);
}

/// Fired on `notifications/message` (server log output).
#[async_trait]
pub trait LoggingConsumer: Send + Sync {
    async fn on_log(&self, message: LoggingMessageNotification);
}

/// Fired on `notifications/progress`, keyed by `progressToken`.
#[async_trait]
pub trait ProgressConsumer: Send + Sync {
    async fn on_progress(&self, progress_token: Value, progress: Value, total: Option<Value>);
}

/// An insertion-ordered map of roots, keyed by `uri` (invariant 5).
/// Re-registering an existing `uri` updates its value in place —
/// "last write wins" (§9 open question), not "reject".
#[derive(Default)]
pub struct RootsMap {
    order: Vec<String>,
    by_uri: HashMap<String, Root>,
}

impl RootsMap {
    pub fn insert(&mut self, root: Root) {
        if !self.by_uri.contains_key(&root.uri) {
            self.order.push(root.uri.clone());
        }
        self.by_uri.insert(root.uri.clone(), root);
    }

    pub fn values_in_order(&self) -> Vec<Root> {
        self.order
            .iter()
            .filter_map(|uri| self.by_uri.get(uri).cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }
}

/// Holds every user-registered consumer and handler, plus the roots map.
/// All mutation happens at build time (before the session starts); after
/// that it is read-only from the dispatcher's and workers' point of view,
/// guarded by locks held only for single-map operations (§5).
#[derive(Default)]
pub struct HandlerRegistry {
    pub roots: RwLock<RootsMap>,
    pub sampling_handler: RwLock<Option<Arc<dyn SamplingHandler>>>,
    pub tools_consumers: RwLock<Vec<Arc<dyn ToolsChangeConsumer>>>,
    pub resources_consumers: RwLock<Vec<Arc<dyn ResourcesChangeConsumer>>>,
    pub prompts_consumers: RwLock<Vec<Arc<dyn PromptsChangeConsumer>>>,
    pub resource_update_consumers: RwLock<HashMap<String, Vec<Arc<dyn ResourceUpdateConsumer>>>>,
    pub logging_consumers: RwLock<Vec<Arc<dyn LoggingConsumer>>>,
    pub progress_consumers: RwLock<HashMap<String, Vec<Arc<dyn ProgressConsumer>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_sampling_handler(&self) -> bool {
        self.sampling_handler.read().is_some()
    }

    pub fn has_roots(&self) -> bool {
        !self.roots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_map_preserves_insertion_order_and_last_write_wins() {
        let mut roots = RootsMap::default();
        roots.insert(Root { uri: "file:///a".into(), name: Some("A".into()) });
        roots.insert(Root { uri: "file:///b".into(), name: Some("B".into()) });
        roots.insert(Root { uri: "file:///a".into(), name: Some("A2".into()) });

        let values = roots.values_in_order();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].uri, "file:///a");
        assert_eq!(values[0].name.as_deref(), Some("A2"));
        assert_eq!(values[1].uri, "file:///b");
    }
}
