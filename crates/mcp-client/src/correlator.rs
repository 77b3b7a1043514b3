//! The correlator (C3): mints request IDs, parks awaiters keyed by ID,
//! resolves them on a matching response, on deadline expiry, or on
//! shutdown.
//!
//! Grounded on `turbomcp-client`'s `MessageDispatcher::response_waiters`
//! (a `Mutex<HashMap<MessageId, oneshot::Sender<JsonRpcResponse>>>`),
//! generalized with a per-awaiter deadline and an expiry sweep — the
//! teacher left this as a code comment ("Future enhancement: Add a
//! background cleanup task or request timeout mechanism to remove stale
//! entries after a configurable duration"); this is that mechanism.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mcp_wire::jsonrpc::{JsonRpcError, RequestId};
use mcp_wire::Error;
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// The terminal event a parked awaiter is resolved with.
#[derive(Debug)]
pub enum Outcome {
    Result(serde_json::Value),
    Application(JsonRpcError),
    Failed(Error),
}

struct Awaiter {
    sender: oneshot::Sender<Outcome>,
    deadline: Instant,
}

/// Request-ID minting plus the parked-awaiter map. Invariant 2 (unique,
/// never-reused IDs) holds because `next_id` only ever increments;
/// invariant 3 (exactly one resolution per awaiter) holds because the map
/// entry is removed atomically with whichever of `complete`/`expire`/
/// `shutdown` observes it first — the loser of a race is a no-op (§4.3
/// tie-break rule).
pub struct Correlator {
    next_id: AtomicI64,
    awaiters: Mutex<HashMap<RequestId, Awaiter>>,
    request_timeout: Duration,
}

impl Correlator {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            next_id: AtomicI64::new(0),
            awaiters: Mutex::new(HashMap::new()),
            request_timeout,
        }
    }

    /// Mints the next monotonically increasing ID for this session.
    pub fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Parks an awaiter for `id` with a deadline of `now + requestTimeout`,
    /// returning the receiving half. Must be called before the
    /// corresponding envelope is handed to the transport, so a response
    /// racing the registration can never be dropped as "unknown".
    pub fn park(&self, id: RequestId) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + self.request_timeout;
        self.awaiters.lock().insert(
            id,
            Awaiter {
                sender: tx,
                deadline,
            },
        );
        rx
    }

    /// Resolves the awaiter for `id`, if still parked. Unknown IDs are
    /// dropped by the caller (the dispatcher logs them) — the server may
    /// have replied after a timeout already cancelled the awaiter.
    pub fn complete(&self, id: &RequestId, outcome: Outcome) -> bool {
        let awaiter = self.awaiters.lock().remove(id);
        match awaiter {
            Some(awaiter) => {
                let _ = awaiter.sender.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Sweeps every awaiter whose deadline has passed, resolving each with
    /// a timeout. Returns the IDs that expired so the caller can emit a
    /// `notifications/cancelled` for each (§4.3).
    pub fn expire(&self, now: Instant) -> Vec<RequestId> {
        let mut expired = Vec::new();
        let mut awaiters = self.awaiters.lock();
        let ids: Vec<RequestId> = awaiters
            .iter()
            .filter(|(_, a)| a.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            if let Some(awaiter) = awaiters.remove(&id) {
                let _ = awaiter.sender.send(Outcome::Failed(Error::timeout(format!(
                    "request {id} timed out"
                ))));
                expired.push(id);
            }
        }
        expired
    }

    /// Resolves every remaining awaiter with `cause`, e.g. on session
    /// shutdown. Idempotent: calling it again on an already-empty map is a
    /// no-op, matching the "shutdown idempotence" testable property.
    pub fn shutdown(&self, cause: Error) {
        let mut awaiters = self.awaiters.lock();
        for (_, awaiter) in awaiters.drain() {
            let _ = awaiter.sender.send(Outcome::Failed(cause.clone()));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.awaiters.lock().len()
    }
}

/// A reference-counted handle shared between the session engine, the
/// dispatcher's inbound loop, and the background expiry sweep.
pub type SharedCorrelator = Arc<Correlator>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_resolves_parked_awaiter() {
        let c = Correlator::new(Duration::from_secs(20));
        let id = c.next_id();
        let rx = c.park(id.clone());
        assert!(c.complete(&id, Outcome::Result(serde_json::json!({"ok": true}))));
        let outcome = rx.await.unwrap();
        matches!(outcome, Outcome::Result(_));
    }

    #[tokio::test]
    async fn complete_on_unknown_id_is_a_no_op() {
        let c = Correlator::new(Duration::from_secs(20));
        let unknown = RequestId::Number(999);
        assert!(!c.complete(&unknown, Outcome::Result(serde_json::Value::Null)));
    }

    #[tokio::test]
    async fn expire_resolves_overdue_awaiters_with_timeout() {
        let c = Correlator::new(Duration::from_millis(1));
        let id = c.next_id();
        let rx = c.park(id.clone());
        tokio::time::sleep(Duration::from_millis(5)).await;
        let expired = c.expire(Instant::now());
        assert_eq!(expired, vec![id]);
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn shutdown_resolves_all_remaining_awaiters() {
        let c = Correlator::new(Duration::from_secs(20));
        let id_a = c.next_id();
        let id_b = c.next_id();
        let rx_a = c.park(id_a);
        let rx_b = c.park(id_b);
        c.shutdown(Error::transport("session closed"));
        assert!(matches!(rx_a.await.unwrap(), Outcome::Failed(_)));
        assert!(matches!(rx_b.await.unwrap(), Outcome::Failed(_)));
        // idempotent: calling again observes no awaiters, no panic.
        c.shutdown(Error::transport("session closed"));
        assert_eq!(c.pending_count(), 0);
    }

    #[tokio::test]
    async fn ids_are_unique_and_monotonic() {
        let c = Correlator::new(Duration::from_secs(20));
        let ids: Vec<_> = (0..5).map(|_| c.next_id()).collect();
        for pair in ids.windows(2) {
            if let (RequestId::Number(a), RequestId::Number(b)) = (&pair[0], &pair[1]) {
                assert!(b > a);
            }
        }
    }
}
