//! Time-bounded key/value caches shared across requests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::analysis::AnalysisMode;
use crate::profiles::Tier;

/// Response cache lifetime.
pub const ANALYSIS_TTL: Duration = Duration::from_secs(5 * 60);
/// Nutrition lookup cache lifetime.
pub const NUTRITION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait TtlStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the value stored under `key` if it is younger than `ttl` at `now`.
    async fn get(&self, key: &str, ttl: Duration, now: Instant) -> Option<V>;

    /// Stores or overwrites `key`.
    async fn put(&self, key: String, value: V, now: Instant);
}

pub struct InMemoryTtlStore<V> {
    entries: DashMap<String, (Instant, V)>,
}

impl<V> Default for InMemoryTtlStore<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

#[async_trait]
impl<V> TtlStore<V> for InMemoryTtlStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str, ttl: Duration, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (created, value) = entry.value();
        if now.saturating_duration_since(*created) > ttl {
            return None;
        }
        Some(value.clone())
    }

    async fn put(&self, key: String, value: V, now: Instant) {
        self.entries.insert(key, (now, value));
    }
}

/// A [`TtlStore`] paired with the lifetime its entries are served for.
pub struct TtlCache<V> {
    store: Box<dyn TtlStore<V>>,
    ttl: Duration,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Box::new(InMemoryTtlStore::default()), ttl)
    }

    pub fn new(store: Box<dyn TtlStore<V>>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now()).await
    }

    pub async fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        self.store.get(key, self.ttl, now).await
    }

    pub async fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key, value, Instant::now()).await
    }

    pub async fn put_at(&self, key: impl Into<String>, value: V, now: Instant) {
        self.store.put(key.into(), value, now).await
    }
}

/// Deterministic cache key for an (image, mode, tier) triple.
pub fn fingerprint(image: &[u8], mode: AnalysisMode, tier: Tier) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image);
    hasher.update([0u8]);
    hasher.update(mode.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(tier.as_str().as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(32);
    for b in &digest[..16] {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_discriminating() {
        let img = b"\xff\xd8\xff\xe0 fake jpeg bytes";
        let a = fingerprint(img, AnalysisMode::Health, Tier::Free);
        let b = fingerprint(img, AnalysisMode::Health, Tier::Free);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);

        assert_ne!(a, fingerprint(img, AnalysisMode::Fitness, Tier::Free));
        assert_ne!(a, fingerprint(img, AnalysisMode::Health, Tier::PremiumMonthly));
        assert_ne!(a, fingerprint(b"other image", AnalysisMode::Health, Tier::Free));
    }

    #[test]
    fn fingerprint_accepts_empty_input() {
        let fp = fingerprint(&[], AnalysisMode::Health, Tier::Free);
        assert_eq!(fp.len(), 32);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache: TtlCache<String> = TtlCache::in_memory(ANALYSIS_TTL);
        let t0 = Instant::now();
        cache.put_at("k", "v".to_string(), t0).await;

        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(299)).await.as_deref(), Some("v"));
        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(301)).await, None);
        assert_eq!(cache.get_at("missing", t0).await, None);
    }

    #[tokio::test]
    async fn put_overwrites_and_refreshes() {
        let cache: TtlCache<u32> = TtlCache::in_memory(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.put_at("k", 1, t0).await;
        cache.put_at("k", 2, t0 + Duration::from_secs(8)).await;
        assert_eq!(cache.get_at("k", t0 + Duration::from_secs(15)).await, Some(2));
    }
}
