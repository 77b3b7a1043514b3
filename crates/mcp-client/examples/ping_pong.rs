//! A minimal, self-contained run of the handshake and a `ping` call.
//!
//! There's no stdio/HTTP transport in this workspace (out of scope, see
//! SPEC_FULL.md §1), so this example plays both sides of the session over
//! an in-memory pair: one task drives `Client`, the other stands in for the
//! server and answers `initialize` and `ping` by hand.
//!
//! ```bash
//! cargo run --package mcp-client --example ping_pong
//! ```

use mcp_client::ClientBuilder;
use mcp_transport::MemoryTransport;
use mcp_wire::jsonrpc::{JsonRpcMessage, JsonRpcResponse};
use mcp_wire::methods;
use mcp_wire::types::{InitializeResult, ServerCapabilities, ServerInfo};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (client_side, server_side) = MemoryTransport::pair();
    let client = ClientBuilder::new(client_side).build();

    let server = tokio::spawn(async move {
        server_side.connect().await.expect("server-side connect");

        let init_request = server_side.receive().await.unwrap().unwrap();
        let id = init_request.id().unwrap().clone();
        let result = InitializeResult {
            protocol_version: methods::LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo { name: "ping-pong-demo".into(), version: "0.1.0".into() },
        };
        server_side
            .send(JsonRpcMessage::Response(JsonRpcResponse::success(
                id,
                serde_json::to_value(result).unwrap(),
            )))
            .await
            .unwrap();

        let _initialized = server_side.receive().await.unwrap().unwrap();

        let ping_request = server_side.receive().await.unwrap().unwrap();
        let id = ping_request.id().unwrap().clone();
        server_side
            .send(JsonRpcMessage::Response(JsonRpcResponse::success(
                id,
                serde_json::json!({}),
            )))
            .await
            .unwrap();
    });

    client.initialize().await.expect("handshake failed");
    tracing::info!(server = ?client.server_info(), "session initialized");

    client.ping().await.expect("ping failed");
    tracing::info!("ping round-trip succeeded");

    client.close().await.expect("close failed");
    server.await.expect("server task panicked");
}
