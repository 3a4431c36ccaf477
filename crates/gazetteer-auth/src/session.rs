//! Session invalidation and the process-wide logout signal
//!
//! When a refresh cycle ends in terminal failure the session is over:
//! both tokens are dropped and a logout event goes out so every feature
//! holding a subscription can fall back to the signed-out state. The same
//! path serves an explicit user logout.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::credentials::CredentialStore;

/// Events published on the session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were cleared; the session is gone.
    LoggedOut,
}

/// Broadcaster for session events.
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create a new broadcaster with default capacity (16).
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create a new broadcaster with the given channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish a session event.
    pub fn publish(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.sender.send(event)
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionEvents {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Clears credentials and announces the logout.
///
/// Idempotent: the clear-and-publish runs only when a credential was
/// actually present, so the waiters of one failed refresh cycle collapse
/// to a single logout event however many of them report the failure.
/// Overlapping invocations serialize on an internal gate and recheck
/// presence once they hold it.
#[derive(Clone)]
pub struct SessionInvalidator {
    store: Arc<dyn CredentialStore>,
    events: SessionEvents,
    gate: Arc<Mutex<()>>,
}

impl SessionInvalidator {
    pub fn new(store: Arc<dyn CredentialStore>, events: SessionEvents) -> Self {
        Self {
            store,
            events,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Drop both tokens and publish `LoggedOut` if a session existed.
    ///
    /// The teardown runs on its own task, like a refresh cycle does, so a
    /// caller dropped mid-invalidation can neither abandon the clear half
    /// done nor block a later invalidation.
    pub async fn invalidate(&self) {
        if self.store.get().await.is_none() {
            debug!("no session to invalidate");
            return;
        }

        let store = self.store.clone();
        let events = self.events.clone();
        let gate = self.gate.clone();
        let teardown = tokio::spawn(async move {
            let _held = gate.lock().await;

            // Recheck under the gate: an overlapping invocation may have
            // already torn the session down.
            if store.get().await.is_none() {
                debug!("session already invalidated");
                return;
            }

            if let Err(e) = store.clear().await {
                // The tokens may survive on disk, but the session is
                // still declared over for this process.
                warn!(error = %e, "failed to clear credentials");
            }

            match events.publish(SessionEvent::LoggedOut) {
                Ok(subscribers) => info!(subscribers, "session invalidated"),
                Err(_) => debug!("session invalidated with no logout subscribers"),
            }
        });

        let _ = teardown.await;
    }
}
