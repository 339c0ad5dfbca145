//! Pending follow-request counter.
//!
//! Each user's inbound pending count is published through a
//! [`tokio::sync::watch`] channel. Only the follow graph writes to it, after
//! every operation that can change the count.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pulse_common::{AppResult, validate_id};
use pulse_db::repositories::FollowEdgeRepository;
use tokio::sync::watch;
use tracing::debug;

/// Publishes per-user pending request counts to badge subscribers.
#[derive(Clone)]
pub struct PendingRequestCounter {
    edge_repo: FollowEdgeRepository,
    channels: Arc<Mutex<HashMap<String, watch::Sender<u64>>>>,
}

impl PendingRequestCounter {
    /// Create a new counter.
    #[must_use]
    pub fn new(edge_repo: FollowEdgeRepository) -> Self {
        Self {
            edge_repo,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of pending requests addressed to `user_id`.
    pub async fn pending_count(&self, user_id: &str) -> AppResult<u64> {
        validate_id("userId", user_id)?;
        self.edge_repo.count_pending_inbound(user_id).await
    }

    /// Subscribe to `user_id`'s count. The receiver starts at a freshly
    /// loaded value.
    pub async fn subscribe(&self, user_id: &str) -> AppResult<watch::Receiver<u64>> {
        let count = self.pending_count(user_id).await?;

        let mut channels = self.lock();
        let rx = match channels.get(user_id) {
            Some(tx) => {
                tx.send_replace(count);
                tx.subscribe()
            }
            None => {
                let (tx, rx) = watch::channel(count);
                channels.insert(user_id.to_string(), tx);
                rx
            }
        };

        Ok(rx)
    }

    /// Recount `user_id`'s pending requests and notify subscribers if the
    /// value changed. Channels nobody listens to any more are dropped.
    pub(crate) async fn refresh(&self, user_id: &str) -> AppResult<u64> {
        let count = self.pending_count(user_id).await?;

        let mut channels = self.lock();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        if let Some(tx) = channels.get(user_id) {
            tx.send_if_modified(|current| {
                let changed = *current != count;
                *current = count;
                changed
            });
        }
        debug!(user_id = %user_id, count, subscribers = channels.len(), "Pending count refreshed");

        Ok(count)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<u64>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
