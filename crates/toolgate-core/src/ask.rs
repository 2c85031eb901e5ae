//! Pending confirmation points and their resolution.
//!
//! An `AskEvent` is created when the model proposes an action that needs
//! confirmation and is resolved exactly once: by the policy, by the human,
//! or by an auto-approval timeout. The `AskBroker` owns the pending
//! response channels and enforces at-most-once resolution.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use toolgate_protocol::{AskKind, AskResponse};
use toolgate_util::Identifier;

/// How long an escalated ask may wait for the human before it is treated
/// as a denial.
pub const ASK_GUARD_TIMEOUT: Duration = Duration::from_secs(300);

/// A pending confirmation point.
#[derive(Debug, Clone)]
pub struct AskEvent {
    /// Unique request ID.
    pub id: String,
    /// Discriminated ask kind.
    pub kind: AskKind,
    /// Opaque payload: JSON tool descriptor, command string, or
    /// structured follow-up suggestions.
    pub payload: String,
    /// Whether the operation touches a protected file.
    pub is_protected: bool,
}

impl AskEvent {
    /// Create a new ask with a fresh ID.
    pub fn new(kind: AskKind, payload: impl Into<String>) -> Self {
        Self {
            id: Identifier::ask(),
            kind,
            payload: payload.into(),
            is_protected: false,
        }
    }

    /// Mark the ask as touching a protected file.
    pub fn protected(mut self) -> Self {
        self.is_protected = true;
        self
    }
}

/// Broker for pending ask responses.
///
/// The dispatcher registers an ask before surfacing it; the UI resolves it
/// through [`AskBroker::respond`]. A second resolution for the same ID is
/// rejected, which is what makes human-response-versus-timeout races safe.
pub struct AskBroker {
    pending: RwLock<HashMap<String, oneshot::Sender<AskResponse>>>,
}

impl AskBroker {
    /// Create a new broker.
    pub fn new() -> Self {
        Self {
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Register a pending ask, returning the receiver for its response.
    pub async fn register(&self, ask_id: &str) -> oneshot::Receiver<AskResponse> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.write().await;
        pending.insert(ask_id.to_string(), tx);
        rx
    }

    /// Resolve a pending ask.
    ///
    /// Returns false if the ask is unknown or was already resolved.
    pub async fn respond(&self, ask_id: &str, response: AskResponse) -> bool {
        let tx = {
            let mut pending = self.pending.write().await;
            pending.remove(ask_id)
        };

        match tx {
            Some(tx) => tx.send(response).is_ok(),
            None => {
                tracing::debug!(ask_id, "response for unknown or already-resolved ask");
                false
            }
        }
    }

    /// Drop a pending ask without resolving it (timeout fired first, or
    /// the task was cancelled).
    pub async fn cancel(&self, ask_id: &str) {
        let mut pending = self.pending.write().await;
        pending.remove(ask_id);
    }

    /// Number of unresolved asks.
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

impl Default for AskBroker {
    fn default() -> Self {
        Self::new()
    }
}
