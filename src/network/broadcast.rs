//! Broadcaster
//!
//! Fan-out of serialized state deltas to every viewer of a session. Each
//! viewer owns a bounded channel; a full or closed channel drops that viewer
//! only, and delivery to the rest carries on.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Receiving end handed to a stream.
pub type Subscription = mpsc::Receiver<Arc<str>>;

/// Subscribers keyed by session, then viewer nick.
pub struct Broadcaster {
    capacity: usize,
    subscribers: Mutex<BTreeMap<String, BTreeMap<String, mpsc::Sender<Arc<str>>>>>,
}

impl Broadcaster {
    /// Broadcaster whose per-viewer queues hold `capacity` payloads.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register `nick` on `session`, replacing an earlier stream of the same
    /// viewer. `initial` is queued before any later delta.
    pub async fn subscribe(&self, session: &str, nick: &str, initial: Option<Arc<str>>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        if let Some(payload) = initial {
            // Fresh channel with capacity >= 1: cannot be full.
            let _ = tx.try_send(payload);
        }

        let mut subs = self.subscribers.lock().await;
        let previous = subs
            .entry(session.to_string())
            .or_default()
            .insert(nick.to_string(), tx);
        if previous.is_some() {
            debug!(session, nick, "replaced existing stream");
        }
        rx
    }

    /// A one-shot stream: `initial` then end of stream, no registration.
    pub fn detached(&self, initial: Arc<str>) -> Subscription {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(initial);
        rx
    }

    /// Deliver `payload` to every viewer of `session`. Returns how many got it.
    pub async fn publish(&self, session: &str, payload: Arc<str>) -> usize {
        let mut subs = self.subscribers.lock().await;
        let Some(viewers) = subs.get_mut(session) else {
            return 0;
        };

        let mut delivered = 0;
        viewers.retain(|nick, tx| match tx.try_send(Arc::clone(&payload)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session, nick = nick.as_str(), "viewer too slow, dropping stream");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session, nick = nick.as_str(), "viewer disconnected");
                false
            }
        });

        if viewers.is_empty() {
            subs.remove(session);
        }
        delivered
    }

    /// Drop every stream of `session`. Queued payloads are still delivered.
    pub async fn close_session(&self, session: &str) -> usize {
        let mut subs = self.subscribers.lock().await;
        subs.remove(session).map(|v| v.len()).unwrap_or(0)
    }

    /// Drop every stream of every session.
    pub async fn close_all(&self) -> usize {
        let mut subs = self.subscribers.lock().await;
        let count = subs.values().map(|v| v.len()).sum();
        subs.clear();
        count
    }

    /// Viewers currently attached to `session`.
    pub async fn subscriber_count(&self, session: &str) -> usize {
        let subs = self.subscribers.lock().await;
        subs.get(session).map(|v| v.len()).unwrap_or(0)
    }
}
