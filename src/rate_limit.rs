//! Per-caller fixed-window rate limiting.
//!
//! Windows live behind [`RateLimitStore`] so the in-process map can be
//! replaced by a shared store without touching the pipeline.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::config::TierLimit;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Counts one operation for `caller` and reports whether it is admitted.
    /// Must be atomic per caller.
    async fn hit(&self, caller: Uuid, limit: TierLimit, now: Instant) -> bool;

    /// Reset instant of the caller's current window, if one exists.
    async fn reset_at(&self, caller: Uuid) -> Option<Instant>;
}

/// Process-local store. Entries are never evicted.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<Uuid, Window>,
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, caller: Uuid, limit: TierLimit, now: Instant) -> bool {
        // entry() holds the shard lock for the whole read-modify-write
        let mut entry = self.windows.entry(caller).or_insert(Window {
            count: 0,
            reset_at: now,
        });
        let w = entry.value_mut();

        if limit.max_requests == 0 {
            return false;
        }
        if w.count == 0 || now >= w.reset_at {
            w.count = 1;
            w.reset_at = now + limit.window;
            return true;
        }
        if w.count < limit.max_requests {
            w.count += 1;
            return true;
        }
        false
    }

    async fn reset_at(&self, caller: Uuid) -> Option<Instant> {
        self.windows.get(&caller).map(|w| w.reset_at)
    }
}

pub struct RateLimiter {
    store: Box<dyn RateLimitStore>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Box::new(InMemoryRateLimitStore::default()))
    }
}

impl RateLimiter {
    pub fn new(store: Box<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    pub async fn allow(&self, caller: Uuid, limit: TierLimit) -> bool {
        self.allow_at(caller, limit, Instant::now()).await
    }

    pub async fn allow_at(&self, caller: Uuid, limit: TierLimit, now: Instant) -> bool {
        let allowed = self.store.hit(caller, limit, now).await;
        if !allowed {
            tracing::debug!(%caller, max = limit.max_requests, "rate limit hit");
        }
        allowed
    }

    pub async fn remaining_time(&self, caller: Uuid) -> Duration {
        self.remaining_time_at(caller, Instant::now()).await
    }

    pub async fn remaining_time_at(&self, caller: Uuid, now: Instant) -> Duration {
        self.store
            .reset_at(caller)
            .await
            .map(|reset| reset.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}
