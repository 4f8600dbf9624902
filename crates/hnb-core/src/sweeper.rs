//! Periodic eviction of idle per-chat and per-user state.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{game::GameStore, security::RateLimiter, session::SessionStore};

/// A store whose idle entries can be dropped.
#[async_trait]
pub trait Sweep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries evicted.
    async fn sweep_expired(&self) -> usize;
}

#[async_trait]
impl Sweep for SessionStore {
    fn name(&self) -> &'static str {
        "sessions"
    }

    async fn sweep_expired(&self) -> usize {
        SessionStore::sweep_expired(self).await
    }
}

#[async_trait]
impl Sweep for GameStore {
    fn name(&self) -> &'static str {
        "games"
    }

    async fn sweep_expired(&self) -> usize {
        GameStore::sweep_expired(self).await
    }
}

#[async_trait]
impl Sweep for Mutex<RateLimiter> {
    fn name(&self) -> &'static str {
        "rate_limiter"
    }

    async fn sweep_expired(&self) -> usize {
        self.lock().await.prune_at(Instant::now())
    }
}

/// One sweep over every store. Returns the total number of evictions.
pub async fn sweep_all(stores: &[Arc<dyn Sweep>]) -> usize {
    let mut total = 0;
    for store in stores {
        let evicted = store.sweep_expired().await;
        if evicted > 0 {
            tracing::debug!(store = store.name(), evicted, "swept idle entries");
        }
        total += evicted;
    }
    total
}

/// Spawn the sweeper loop. It runs until `cancel` fires.
pub fn spawn_sweeper(
    stores: Vec<Arc<dyn Sweep>>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every.max(Duration::from_millis(1)));
        // The first tick fires immediately; nothing can be idle yet.
        tick.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    let total = sweep_all(&stores).await;
                    if total > 0 {
                        tracing::info!(evicted = total, "idle state evicted");
                    }
                }
            }
        }
        tracing::debug!("sweeper stopped");
    })
}
