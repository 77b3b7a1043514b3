//! An in-memory paired-channel transport. Not a deliverable transport
//! binding — test scaffolding only, so the session engine can be exercised
//! end to end without a real subprocess or socket (the teacher's own
//! dispatcher tests note that full integration coverage "require[s] a mock
//! transport"; this is that mock, generalized into a reusable crate item
//! rather than a one-off test fixture).

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex as StdMutex;

use mcp_wire::jsonrpc::JsonRpcMessage;
use tokio::sync::{mpsc, Mutex};

use crate::error::{TransportError, TransportResult};
use crate::traits::{Transport, TransportState};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One end of an in-memory duplex pipe. `MemoryTransport::pair()` returns
/// two of these, wired to each other, so a test can drive "the server
/// side" directly while the engine drives "the client side".
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<JsonRpcMessage>,
    inbound: Mutex<mpsc::UnboundedReceiver<JsonRpcMessage>>,
    state: StdMutex<TransportState>,
}

impl MemoryTransport {
    /// Creates a connected pair: messages sent on one end arrive via
    /// `receive` on the other.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = Self {
            outbound: a_tx,
            inbound: Mutex::new(a_rx),
            state: StdMutex::new(TransportState::Disconnected),
        };
        let b = Self {
            outbound: b_tx,
            inbound: Mutex::new(b_rx),
            state: StdMutex::new(TransportState::Disconnected),
        };
        (a, b)
    }
}

impl Transport for MemoryTransport {
    fn connect(&self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            *self.state.lock().unwrap() = TransportState::Connected;
            Ok(())
        })
    }

    fn send(&self, message: JsonRpcMessage) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            self.outbound
                .send(message)
                .map_err(|_| TransportError::SendFailed("peer dropped".into()))
        })
    }

    fn receive(&self) -> BoxFuture<'_, TransportResult<Option<JsonRpcMessage>>> {
        Box::pin(async move {
            let mut rx = self.inbound.lock().await;
            Ok(rx.recv().await)
        })
    }

    fn close(&self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            *self.state.lock().unwrap() = TransportState::Disconnecting;
            *self.state.lock().unwrap() = TransportState::Disconnected;
            Ok(())
        })
    }

    fn state(&self) -> TransportState {
        self.state.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_wire::jsonrpc::JsonRpcNotification;

    #[tokio::test]
    async fn messages_flow_in_arrival_order() {
        let (client, server) = MemoryTransport::pair();
        client.connect().await.unwrap();
        server.connect().await.unwrap();

        for i in 0..3 {
            let note = JsonRpcNotification::new("notifications/progress", serde_json::json!({"i": i}));
            client
                .send(JsonRpcMessage::Notification(note))
                .await
                .unwrap();
        }

        for expected in 0..3 {
            let msg = server.receive().await.unwrap().unwrap();
            let method = msg.method().unwrap().to_string();
            assert_eq!(method, "notifications/progress");
            if let JsonRpcMessage::Notification(n) = msg {
                assert_eq!(n.params["i"], expected);
            } else {
                panic!("expected notification");
            }
        }
    }

    #[tokio::test]
    async fn receive_returns_none_after_sender_dropped() {
        let (client, server) = MemoryTransport::pair();
        client.connect().await.unwrap();
        drop(client);
        let msg = server.receive().await.unwrap();
        assert!(msg.is_none());
    }
}
