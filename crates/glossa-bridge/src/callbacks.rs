//! Pending-callback registry.
//!
//! Maps a generated callback identifier to the one-shot continuation of the
//! command that registered it. Entries are removed exactly once — on fire —
//! and a periodic sweep evicts entries the overlay never answered, so an
//! unanswered command resolves to a timeout instead of leaking forever.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use glossa_common::{new_callback_id, BridgeError};

/// Raw reply fields of an inbound `token:`/`callback:` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackReply {
    pub result: String,
    pub error: String,
}

impl CallbackReply {
    /// A non-empty error field resolves to failure; otherwise success with
    /// the (possibly empty) result string.
    pub fn into_result(self) -> Result<String, BridgeError> {
        if self.error.is_empty() {
            Ok(self.result)
        } else {
            Err(BridgeError::Script(self.error))
        }
    }
}

type ReplySender = oneshot::Sender<Result<String, BridgeError>>;

struct PendingEntry {
    tx: ReplySender,
    registered_at: Instant,
}

/// One-shot continuations keyed by callback identifier.
#[derive(Default)]
pub struct CallbackRegistry {
    pending: HashMap<String, PendingEntry>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a continuation under a freshly generated identifier.
    pub fn register(&mut self, tx: ReplySender) -> String {
        let id = new_callback_id();
        self.pending.insert(
            id.clone(),
            PendingEntry {
                tx,
                registered_at: Instant::now(),
            },
        );
        id
    }

    /// Withdraw a continuation that was registered but whose command could
    /// not be submitted.
    pub fn withdraw(&mut self, id: &str) -> Option<ReplySender> {
        self.pending.remove(id).map(|entry| entry.tx)
    }

    /// Fire and remove the identified continuation. Returns `false` when no
    /// entry matches, which callers treat as a droppable message.
    pub fn fire(&mut self, id: &str, reply: CallbackReply) -> bool {
        match self.pending.remove(id) {
            Some(entry) => {
                if entry.tx.send(reply.into_result()).is_err() {
                    tracing::debug!(callback_id = %id, "callback receiver dropped");
                }
                true
            }
            None => false,
        }
    }

    /// Evict entries older than `max_age`, resolving each to a timeout.
    /// Returns how many were evicted.
    pub fn evict_expired(&mut self, max_age: Duration) -> usize {
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.registered_at.elapsed() > max_age)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            if let Some(entry) = self.pending.remove(id) {
                let _ = entry.tx.send(Err(BridgeError::Timeout));
            }
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
