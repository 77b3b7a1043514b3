//! The session engine (C5): the initialize handshake, session lifecycle
//! state, and the ten typed client operations of §4.5.
//!
//! Grounded on `turbomcp-client/src/client/core.rs`'s `initialize()` and
//! `operations/*.rs`'s per-call precondition checks, adjusted to return
//! the full typed result structs from `mcp_wire::types` instead of the
//! teacher's content-flattening convenience methods. The teacher's own
//! code is inconsistent about whether operations reach session state
//! through `self.protocol`/`self.initialized` or `self.inner.protocol`/
//! `self.inner.initialized`; this engine picks one path — every operation
//! and the handshake go through `Client`'s own fields directly — and holds
//! to it throughout.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcp_wire::jsonrpc::RequestId;
use mcp_wire::methods::{client_to_server, notifications, server_to_client};
use mcp_wire::types::{
    CallToolResult, CompleteParams, CompleteResult, CompletionArgument, CompletionContext,
    CompletionReference, CreateMessageRequest, GetPromptResult, InitializeParams,
    InitializeResult, ListParams, ListPromptsResult, ListResourceTemplatesResult,
    ListResourcesResult, ListRootsResult, ListToolsResult, LoggingLevel,
    LoggingMessageNotification, ReadResourceResult, ServerCapabilities,
};
use mcp_wire::{methods, Error, ErrorKind, ServerInfo};
use mcp_transport::Transport;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::handlers::HandlerRegistry;

/// Session lifecycle (§3 Lifecycles). Only `Initialized` permits
/// user-facing operations other than `ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Initialized,
    Closing,
    Closed,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Drains a per-kind unbounded channel sequentially, invoking `process` for
/// each message in arrival order. The dispatcher's notification handler
/// only ever does a non-blocking `send` into the channel before returning
/// to `transport.receive()` (§4.6's "must not block the dispatcher").
struct NotificationWorker<Msg> {
    tx: mpsc::UnboundedSender<Msg>,
}

impl<Msg: Send + 'static> NotificationWorker<Msg> {
    fn spawn<F>(mut process: F) -> Self
    where
        F: FnMut(Msg) -> BoxFuture<()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                process(msg).await;
            }
        });
        Self { tx }
    }

    fn send(&self, msg: Msg) {
        let _ = self.tx.send(msg);
    }
}

type ProgressMsg = (Value, Value, Option<Value>);

/// Owns the session state, the dispatcher, the handler registry, and the
/// per-kind notification workers. One instance per connected session.
pub struct Client<T: Transport + 'static> {
    transport: Arc<T>,
    dispatcher: Arc<Dispatcher<T>>,
    registry: Arc<HandlerRegistry>,
    config: ClientConfig,
    state: RwLock<SessionState>,
    server_info: RwLock<Option<ServerInfo>>,
    server_capabilities: RwLock<Option<ServerCapabilities>>,
    client_capabilities: mcp_wire::types::ClientCapabilities,
    tools_worker: NotificationWorker<()>,
    resources_worker: NotificationWorker<()>,
    prompts_worker: NotificationWorker<()>,
    resource_updated_worker: NotificationWorker<String>,
    logging_worker: NotificationWorker<LoggingMessageNotification>,
    progress_worker: NotificationWorker<ProgressMsg>,
}

impl<T: Transport + 'static> Client<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        config: ClientConfig,
        registry: Arc<HandlerRegistry>,
        client_capabilities: mcp_wire::types::ClientCapabilities,
    ) -> Arc<Self> {
        let dispatcher = Dispatcher::new(Arc::clone(&transport), config.request_timeout);

        let tools_worker = {
            let dispatcher = Arc::clone(&dispatcher);
            let registry = Arc::clone(&registry);
            NotificationWorker::spawn(move |()| {
                let dispatcher = Arc::clone(&dispatcher);
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    match refresh_tools(&dispatcher).await {
                        Ok(tools) => {
                            for consumer in registry.tools_consumers.read().iter() {
                                consumer.on_tools_changed(tools.clone()).await;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to refresh tools list"),
                    }
                })
            })
        };

        let resources_worker = {
            let dispatcher = Arc::clone(&dispatcher);
            let registry = Arc::clone(&registry);
            NotificationWorker::spawn(move |()| {
                let dispatcher = Arc::clone(&dispatcher);
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    match refresh_resources(&dispatcher).await {
                        Ok(resources) => {
                            for consumer in registry.resources_consumers.read().iter() {
                                consumer.on_resources_changed(resources.clone()).await;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to refresh resources list"),
                    }
                })
            })
        };

        let prompts_worker = {
            let dispatcher = Arc::clone(&dispatcher);
            let registry = Arc::clone(&registry);
            NotificationWorker::spawn(move |()| {
                let dispatcher = Arc::clone(&dispatcher);
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    match refresh_prompts(&dispatcher).await {
                        Ok(prompts) => {
                            for consumer in registry.prompts_consumers.read().iter() {
                                consumer.on_prompts_changed(prompts.clone()).await;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to refresh prompts list"),
                    }
                })
            })
        };

        let resource_updated_worker = {
            let registry = Arc::clone(&registry);
            NotificationWorker::spawn(move |uri: String| {
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    let consumers = registry
                        .resource_update_consumers
                        .read()
                        .get(&uri)
                        .cloned()
                        .unwrap_or_default();
                    for consumer in consumers {
                        consumer.on_resource_updated(uri.clone()).await;
                    }
                })
            })
        };

        let logging_worker = {
            let registry = Arc::clone(&registry);
            NotificationWorker::spawn(move |note: LoggingMessageNotification| {
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    for consumer in registry.logging_consumers.read().iter() {
                        consumer.on_log(note.clone()).await;
                    }
                })
            })
        };

        let progress_worker = {
            let registry = Arc::clone(&registry);
            NotificationWorker::spawn(move |(token, progress, total): ProgressMsg| {
                let registry = Arc::clone(&registry);
                let token_key = token
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| token.to_string());
                Box::pin(async move {
                    let consumers = registry
                        .progress_consumers
                        .read()
                        .get(&token_key)
                        .cloned()
                        .unwrap_or_default();
                    for consumer in consumers {
                        consumer
                            .on_progress(token.clone(), progress.clone(), total.clone())
                            .await;
                    }
                })
            })
        };

        Arc::new(Self {
            transport,
            dispatcher,
            registry,
            config,
            state: RwLock::new(SessionState::Disconnected),
            server_info: RwLock::new(None),
            server_capabilities: RwLock::new(None),
            client_capabilities,
            tools_worker,
            resources_worker,
            prompts_worker,
            resource_updated_worker,
            logging_worker,
            progress_worker,
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn server_info(&self) -> Option<ServerInfo> {
        self.server_info.read().clone()
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.server_capabilities.read().clone()
    }

    pub fn client_capabilities(&self) -> &mcp_wire::types::ClientCapabilities {
        &self.client_capabilities
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    /// Runs the four-step handshake of §4.5: connect, send `initialize`,
    /// validate the protocol version and capture server state, send
    /// `notifications/initialized`. Registers the built-in request/
    /// notification handlers before the dispatcher's inbound loop starts,
    /// so no inbound envelope can arrive unrouted.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), Error> {
        self.set_state(SessionState::Connecting);
        self.transport.connect().await.map_err(Error::from)?;

        self.install_builtin_handlers();
        self.dispatcher.start();

        let params = InitializeParams {
            protocol_version: methods::LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: self.client_capabilities.clone(),
            client_info: self.config.client_info.clone(),
        };
        let request_value = serde_json::to_value(&params)
            .map_err(|e| Error::protocol(e.to_string()))?;

        let result = match self
            .dispatcher
            .request(client_to_server::INITIALIZE, request_value)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                self.fail_handshake(e.clone()).await;
                return Err(e);
            }
        };

        let initialize_result: InitializeResult = match serde_json::from_value(result) {
            Ok(r) => r,
            Err(e) => {
                let err = Error::protocol(format!("malformed initialize result: {e}"));
                self.fail_handshake(err.clone()).await;
                return Err(err);
            }
        };

        if !methods::SUPPORTED_PROTOCOL_VERSIONS.contains(&initialize_result.protocol_version.as_str())
        {
            let err = Error::protocol(format!(
                "unsupported protocol version: {}",
                initialize_result.protocol_version
            ));
            self.fail_handshake(err.clone()).await;
            return Err(err);
        }

        *self.server_info.write() = Some(initialize_result.server_info);
        *self.server_capabilities.write() = Some(initialize_result.capabilities);

        self.dispatcher
            .notify(notifications::INITIALIZED, Value::Null)
            .await;
        self.set_state(SessionState::Initialized);
        Ok(())
    }

    async fn fail_handshake(&self, cause: Error) {
        self.set_state(SessionState::Closing);
        self.dispatcher.shutdown(cause.clone());
        let _ = self.transport.close().await;
        self.set_state(SessionState::Closed);
    }

    /// Closes the session: cancels every pending awaiter, then closes the
    /// transport. Idempotent (§8 "shutdown idempotence").
    pub async fn close(&self) -> Result<(), Error> {
        if matches!(self.state(), SessionState::Closed) {
            return Ok(());
        }
        self.set_state(SessionState::Closing);
        self.dispatcher.shutdown(Error::cancelled("session closed"));
        self.transport.close().await.map_err(Error::from)?;
        self.set_state(SessionState::Closed);
        Ok(())
    }

    fn require_initialized(&self) -> Result<(), Error> {
        if self.state() == SessionState::Initialized {
            Ok(())
        } else {
            Err(Error::pre_flight("session is not initialized"))
        }
    }

    fn require_capability(&self, supported: bool, name: &'static str) -> Result<(), Error> {
        if supported {
            Ok(())
        } else {
            Err(Error::pre_flight(format!("server does not support {name}")))
        }
    }

    fn server_caps(&self) -> ServerCapabilities {
        self.server_capabilities.read().clone().unwrap_or_default()
    }

    fn install_builtin_handlers(self: &Arc<Self>) {
        self.dispatcher.set_request_handler(
            server_to_client::PING,
            Arc::new(|_params: Value| -> BoxFuture<Result<Value, Error>> {
                Box::pin(async move { Ok(serde_json::json!({})) })
            }),
        );

        let registry = Arc::clone(&self.registry);
        self.dispatcher.set_request_handler(
            server_to_client::ROOTS_LIST,
            Arc::new(move |_params: Value| -> BoxFuture<Result<Value, Error>> {
                let registry = Arc::clone(&registry);
                Box::pin(async move {
                    let roots = registry.roots.read().values_in_order();
                    serde_json::to_value(ListRootsResult { roots })
                        .map_err(|e| Error::handler(e.to_string()))
                })
            }),
        );

        if let Some(sampling_handler) = self.registry.sampling_handler.read().clone() {
            self.dispatcher.set_request_handler(
                server_to_client::SAMPLING_CREATE_MESSAGE,
                Arc::new(move |params: Value| -> BoxFuture<Result<Value, Error>> {
                    let sampling_handler = Arc::clone(&sampling_handler);
                    Box::pin(async move {
                        let request: CreateMessageRequest = serde_json::from_value(params)
                            .map_err(|e| Error::protocol(e.to_string()))?;
                        let result = sampling_handler
                            .handle_create_message(request)
                            .await
                            .map_err(|e| Error::handler(e.message))?;
                        serde_json::to_value(result).map_err(|e| Error::handler(e.to_string()))
                    })
                }),
            );
        }

        let this = Arc::clone(self);
        self.dispatcher.set_notification_handler(
            notifications::TOOLS_LIST_CHANGED,
            Arc::new(move |_params: Value| -> BoxFuture<()> {
                this.tools_worker.send(());
                Box::pin(async move {})
            }),
        );

        let this = Arc::clone(self);
        self.dispatcher.set_notification_handler(
            notifications::RESOURCES_LIST_CHANGED,
            Arc::new(move |_params: Value| -> BoxFuture<()> {
                this.resources_worker.send(());
                Box::pin(async move {})
            }),
        );

        let this = Arc::clone(self);
        self.dispatcher.set_notification_handler(
            notifications::PROMPTS_LIST_CHANGED,
            Arc::new(move |_params: Value| -> BoxFuture<()> {
                this.prompts_worker.send(());
                Box::pin(async move {})
            }),
        );

        let this = Arc::clone(self);
        self.dispatcher.set_notification_handler(
            notifications::RESOURCES_UPDATED,
            Arc::new(move |params: Value| -> BoxFuture<()> {
                if let Some(uri) = params.get("uri").and_then(Value::as_str) {
                    this.resource_updated_worker.send(uri.to_string());
                }
                Box::pin(async move {})
            }),
        );

        let this = Arc::clone(self);
        self.dispatcher.set_notification_handler(
            notifications::MESSAGE,
            Arc::new(move |params: Value| -> BoxFuture<()> {
                match serde_json::from_value::<LoggingMessageNotification>(params) {
                    Ok(note) => this.logging_worker.send(note),
                    Err(e) => tracing::debug!(error = %e, "malformed logging notification"),
                }
                Box::pin(async move {})
            }),
        );

        let this = Arc::clone(self);
        self.dispatcher.set_notification_handler(
            notifications::CANCELLED,
            Arc::new(move |params: Value| -> BoxFuture<()> {
                if let Some(request_id) = params.get("requestId").and_then(Value::as_str) {
                    this.dispatcher.correlator().complete(
                        &RequestId::String(request_id.to_string()),
                        crate::correlator::Outcome::Failed(Error::cancelled(
                            "cancelled by peer notification",
                        )),
                    );
                }
                Box::pin(async move {})
            }),
        );

        let this = Arc::clone(self);
        self.dispatcher.set_notification_handler(
            notifications::PROGRESS,
            Arc::new(move |params: Value| -> BoxFuture<()> {
                if let Some(token) = params.get("progressToken").cloned() {
                    let progress = params.get("progress").cloned().unwrap_or(Value::Null);
                    let total = params.get("total").cloned();
                    this.progress_worker.send((token, progress, total));
                }
                Box::pin(async move {})
            }),
        );
    }

    // ---- Typed operations (§4.5) ----

    pub async fn ping(&self) -> Result<(), Error> {
        self.require_initialized()?;
        self.dispatcher
            .request(client_to_server::PING, Value::Null)
            .await?;
        Ok(())
    }

    pub async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_tools(), "tools")?;
        let params = serde_json::to_value(ListParams { cursor })
            .map_err(|e| Error::protocol(e.to_string()))?;
        let value = self
            .dispatcher
            .request(client_to_server::TOOLS_LIST, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_tools(), "tools")?;
        let params = serde_json::json!({"name": name, "arguments": arguments});
        let value = self
            .dispatcher
            .request(client_to_server::TOOLS_CALL, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }

    pub async fn list_resources(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourcesResult, Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_resources(), "resources")?;
        let params = serde_json::to_value(ListParams { cursor })
            .map_err(|e| Error::protocol(e.to_string()))?;
        let value = self
            .dispatcher
            .request(client_to_server::RESOURCES_LIST, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_resources(), "resources")?;
        let params = serde_json::json!({"uri": uri});
        let value = self
            .dispatcher
            .request(client_to_server::RESOURCES_READ, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }

    pub async fn list_resource_templates(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourceTemplatesResult, Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_resources(), "resources")?;
        let params = serde_json::to_value(ListParams { cursor })
            .map_err(|e| Error::protocol(e.to_string()))?;
        let value = self
            .dispatcher
            .request(client_to_server::RESOURCES_TEMPLATES_LIST, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }

    pub async fn subscribe_resource(&self, uri: &str) -> Result<(), Error> {
        self.require_initialized()?;
        self.require_capability(
            self.server_caps().supports_resource_subscribe(),
            "resources.subscribe",
        )?;
        self.dispatcher
            .request(client_to_server::RESOURCES_SUBSCRIBE, serde_json::json!({"uri": uri}))
            .await?;
        Ok(())
    }

    pub async fn unsubscribe_resource(&self, uri: &str) -> Result<(), Error> {
        self.require_initialized()?;
        self.require_capability(
            self.server_caps().supports_resource_subscribe(),
            "resources.subscribe",
        )?;
        self.dispatcher
            .request(
                client_to_server::RESOURCES_UNSUBSCRIBE,
                serde_json::json!({"uri": uri}),
            )
            .await?;
        Ok(())
    }

    pub async fn list_prompts(&self, cursor: Option<String>) -> Result<ListPromptsResult, Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_prompts(), "prompts")?;
        let params = serde_json::to_value(ListParams { cursor })
            .map_err(|e| Error::protocol(e.to_string()))?;
        let value = self
            .dispatcher
            .request(client_to_server::PROMPTS_LIST, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<GetPromptResult, Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_prompts(), "prompts")?;
        let mut params = serde_json::json!({"name": name});
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        let value = self
            .dispatcher
            .request(client_to_server::PROMPTS_GET, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }

    pub async fn set_logging_level(&self, level: LoggingLevel) -> Result<(), Error> {
        self.require_initialized()?;
        self.require_capability(self.server_caps().supports_logging(), "logging")?;
        let params = serde_json::json!({"level": level});
        self.dispatcher
            .request(client_to_server::LOGGING_SET_LEVEL, params)
            .await?;
        Ok(())
    }

    /// Requests argument-completion suggestions for a prompt or resource
    /// template. `ServerCapabilities` carries no dedicated marker for this
    /// operation (§3), so the only precondition is session state, same as
    /// `ping`; a server that doesn't support it replies with method-not-found
    /// and that surfaces as an ordinary application error.
    pub async fn complete(
        &self,
        reference: CompletionReference,
        argument_name: &str,
        argument_value: &str,
        context: Option<CompletionContext>,
    ) -> Result<CompleteResult, Error> {
        self.require_initialized()?;
        let params = serde_json::to_value(CompleteParams {
            reference,
            argument: CompletionArgument {
                name: argument_name.to_string(),
                value: argument_value.to_string(),
            },
            context,
        })
        .map_err(|e| Error::protocol(e.to_string()))?;
        let value = self
            .dispatcher
            .request(client_to_server::COMPLETION_COMPLETE, params)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))
    }
}

async fn paginate<T, F, Fut, I>(
    method: &'static str,
    dispatcher: &Arc<Dispatcher<T>>,
    extract: F,
) -> Result<Vec<I>, Error>
where
    T: Transport + 'static,
    F: Fn(Value) -> Fut,
    Fut: Future<Output = Result<(Vec<I>, Option<String>), Error>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    loop {
        let params = serde_json::to_value(ListParams { cursor: cursor.clone() })
            .map_err(|e| Error::protocol(e.to_string()))?;
        let value = dispatcher.request(method, params).await?;
        let (mut page, next_cursor) = extract(value).await?;
        items.append(&mut page);
        match next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(items)
}

async fn refresh_tools<T: Transport + 'static>(
    dispatcher: &Arc<Dispatcher<T>>,
) -> Result<Vec<mcp_wire::types::Tool>, Error> {
    paginate(client_to_server::TOOLS_LIST, dispatcher, |value| async move {
        let result: ListToolsResult =
            serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))?;
        Ok((result.tools, result.next_cursor))
    })
    .await
}

async fn refresh_resources<T: Transport + 'static>(
    dispatcher: &Arc<Dispatcher<T>>,
) -> Result<Vec<mcp_wire::types::Resource>, Error> {
    paginate(client_to_server::RESOURCES_LIST, dispatcher, |value| async move {
        let result: ListResourcesResult =
            serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))?;
        Ok((result.resources, result.next_cursor))
    })
    .await
}

async fn refresh_prompts<T: Transport + 'static>(
    dispatcher: &Arc<Dispatcher<T>>,
) -> Result<Vec<mcp_wire::types::Prompt>, Error> {
    paginate(client_to_server::PROMPTS_LIST, dispatcher, |value| async move {
        let result: ListPromptsResult =
            serde_json::from_value(value).map_err(|e| Error::protocol(e.to_string()))?;
        Ok((result.prompts, result.next_cursor))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_transport::MemoryTransport;
    use mcp_wire::types::{ClientCapabilities, ServerInfo as WireServerInfo};

    fn test_config() -> ClientConfig {
        ClientConfig {
            request_timeout: std::time::Duration::from_secs(5),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn operations_fail_preflight_before_initialize() {
        let (engine_side, _peer_side) = MemoryTransport::pair();
        let client = Client::new(
            Arc::new(engine_side),
            test_config(),
            Arc::new(HandlerRegistry::new()),
            ClientCapabilities::default(),
        );

        let err = client.ping().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PreFlight);
    }

    #[tokio::test]
    async fn handshake_success_transitions_to_initialized() {
        let (engine_side, peer_side) = MemoryTransport::pair();
        peer_side.connect().await.unwrap();
        let client = Client::new(
            Arc::new(engine_side),
            test_config(),
            Arc::new(HandlerRegistry::new()),
            ClientCapabilities::default(),
        );

        let server_task = tokio::spawn(async move {
            let request = peer_side.receive().await.unwrap().unwrap();
            let id = request.id().unwrap().clone();
            let result = InitializeResult {
                protocol_version: methods::LATEST_PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities::default(),
                server_info: WireServerInfo { name: "srv".into(), version: "1".into() },
            };
            peer_side
                .send(mcp_wire::jsonrpc::JsonRpcMessage::Response(
                    mcp_wire::jsonrpc::JsonRpcResponse::success(
                        id,
                        serde_json::to_value(result).unwrap(),
                    ),
                ))
                .await
                .unwrap();

            let initialized = peer_side.receive().await.unwrap().unwrap();
            assert_eq!(initialized.method(), Some(notifications::INITIALIZED));
        });

        client.initialize().await.unwrap();
        server_task.await.unwrap();
        assert_eq!(client.state(), SessionState::Initialized);
        assert_eq!(client.server_info().unwrap().name, "srv");
    }

    #[tokio::test]
    async fn complete_round_trips_through_the_dispatcher() {
        let (engine_side, peer_side) = MemoryTransport::pair();
        peer_side.connect().await.unwrap();
        let client = Client::new(
            Arc::new(engine_side),
            test_config(),
            Arc::new(HandlerRegistry::new()),
            ClientCapabilities::default(),
        );

        let server_task = tokio::spawn(async move {
            let init_request = peer_side.receive().await.unwrap().unwrap();
            let id = init_request.id().unwrap().clone();
            let result = InitializeResult {
                protocol_version: methods::LATEST_PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities::default(),
                server_info: WireServerInfo { name: "srv".into(), version: "1".into() },
            };
            peer_side
                .send(mcp_wire::jsonrpc::JsonRpcMessage::Response(
                    mcp_wire::jsonrpc::JsonRpcResponse::success(
                        id,
                        serde_json::to_value(result).unwrap(),
                    ),
                ))
                .await
                .unwrap();
            let _initialized = peer_side.receive().await.unwrap().unwrap();

            let complete_request = peer_side.receive().await.unwrap().unwrap();
            assert_eq!(complete_request.method(), Some(client_to_server::COMPLETION_COMPLETE));
            let id = complete_request.id().unwrap().clone();
            peer_side
                .send(mcp_wire::jsonrpc::JsonRpcMessage::Response(
                    mcp_wire::jsonrpc::JsonRpcResponse::success(
                        id,
                        serde_json::json!({"completion": {"values": ["alpha", "beta"]}}),
                    ),
                ))
                .await
                .unwrap();
        });

        client.initialize().await.unwrap();
        let result = client
            .complete(
                CompletionReference::Prompt { name: "greeting".into() },
                "name",
                "al",
                None,
            )
            .await
            .unwrap();
        server_task.await.unwrap();
        assert_eq!(result.completion.values, vec!["alpha", "beta"]);
    }
}
