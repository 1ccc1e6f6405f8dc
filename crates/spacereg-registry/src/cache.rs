//! Time-bounded cache of provider answers
//!
//! Off by default. When enabled, successful `ListStorageSpaces` answers are
//! kept for a fixed TTL, keyed by provider address, requesting user and the
//! exact filter list. Refusals and transport errors always go to the
//! provider again.

use async_trait::async_trait;
use parking_lot::RwLock;
use spacereg_core::{
    ListStorageSpacesResponse, ProviderClient, ProviderConnector, RequestContext, Result, Space,
    SpaceFilter,
};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Identity of one cached answer
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    /// Provider address
    pub address: String,
    /// Opaque id of the requesting user, if any
    pub user: Option<String>,
    /// Filters sent to the provider
    pub filters: Vec<SpaceFilter>,
}

impl CacheKey {
    /// Key for a call made on behalf of `ctx`
    pub fn new(address: &str, ctx: &RequestContext, filters: &[SpaceFilter]) -> Self {
        Self {
            address: address.to_string(),
            user: ctx.user().map(|u| u.id.opaque_id.clone()),
            filters: filters.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedSpaces {
    spaces: Vec<Space>,
    expires_at: Instant,
}

impl CachedSpaces {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held, expired ones included
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
}

/// Concurrency-safe space cache with per-entry expiry
///
/// Callers pass the current instant, which keeps expiry testable.
#[derive(Debug)]
pub struct SpaceCache {
    entries: RwLock<HashMap<CacheKey, CachedSpaces>>,
    ttl: Duration,
    capacity: NonZeroUsize,
}

impl SpaceCache {
    /// Create a cache; a zero capacity is raised to one
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Look up a live entry, dropping it if it has expired
    pub fn get(&self, key: &CacheKey, now: Instant) -> Option<Vec<Space>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(cached) if !cached.is_expired(now) => return Some(cached.spaces.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.remove_if_expired(key, now);
        None
    }

    /// Drop `key` unless a concurrent insert refreshed it
    fn remove_if_expired(&self, key: &CacheKey, now: Instant) {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|cached| cached.is_expired(now)) {
            entries.remove(key);
        }
    }

    /// Store an answer, evicting to stay within capacity
    pub fn insert(&self, key: CacheKey, spaces: Vec<Space>, now: Instant) {
        let mut entries = self.entries.write();
        if !entries.contains_key(&key) && entries.len() >= self.capacity.get() {
            entries.retain(|_, cached| !cached.is_expired(now));
            if entries.len() >= self.capacity.get() {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.expires_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(
            key,
            CachedSpaces {
                spaces,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.read().len(),
            capacity: self.capacity.get(),
        }
    }
}

/// Provider client answering repeated queries from a [`SpaceCache`]
pub struct CachingProviderClient<C> {
    address: String,
    inner: C,
    cache: Arc<SpaceCache>,
}

impl<C> CachingProviderClient<C> {
    /// Wrap `inner`, the client for `address`
    pub fn new(address: impl Into<String>, inner: C, cache: Arc<SpaceCache>) -> Self {
        Self {
            address: address.into(),
            inner,
            cache,
        }
    }
}

#[async_trait]
impl<C: ProviderClient> ProviderClient for CachingProviderClient<C> {
    async fn list_storage_spaces(
        &self,
        ctx: &RequestContext,
        filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        let key = CacheKey::new(&self.address, ctx, filters);
        if let Some(spaces) = self.cache.get(&key, Instant::now()) {
            trace!(address = %self.address, "space cache hit");
            return Ok(ListStorageSpacesResponse::ok(spaces));
        }

        let response = self.inner.list_storage_spaces(ctx, filters).await?;
        if response.status.is_ok() {
            self.cache
                .insert(key, response.spaces.clone(), Instant::now());
        }
        Ok(response)
    }
}

/// Connector handing out [`CachingProviderClient`]s over a shared cache
pub struct CachingConnector {
    inner: Arc<dyn ProviderConnector>,
    cache: Arc<SpaceCache>,
}

impl CachingConnector {
    /// Wrap `inner`
    pub fn new(inner: Arc<dyn ProviderConnector>, cache: Arc<SpaceCache>) -> Self {
        Self { inner, cache }
    }

    /// The shared cache
    pub fn cache(&self) -> &Arc<SpaceCache> {
        &self.cache
    }
}

impl ProviderConnector for CachingConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn ProviderClient>> {
        let client = self.inner.connect(address)?;
        Ok(Arc::new(CachingProviderClient::new(
            address,
            client,
            Arc::clone(&self.cache),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacereg_core::{MemoryProvider, StatusCode, User};
    use spacereg_testkit::{CountingProvider, StatusProvider};

    fn key(address: &str) -> CacheKey {
        CacheKey {
            address: address.to_string(),
            user: None,
            filters: vec![SpaceFilter::SpaceType("project".into())],
        }
    }

    fn spaces() -> Vec<Space> {
        vec![Space::new("s1", "p1", "Project", "project")]
    }

    #[test]
    fn test_entries_expire() {
        let cache = SpaceCache::new(8, Duration::from_secs(30));
        let now = Instant::now();
        cache.insert(key("a"), spaces(), now);
        assert_eq!(cache.get(&key("a"), now + Duration::from_secs(29)), Some(spaces()));
        assert_eq!(cache.get(&key("a"), now + Duration::from_secs(30)), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_refreshed_entry_survives_stale_removal() {
        let cache = SpaceCache::new(8, Duration::from_secs(30));
        let now = Instant::now();
        cache.insert(key("a"), spaces(), now);
        let expired_at = now + Duration::from_secs(30);

        // Another request refreshes the entry between the read and write locks
        cache.insert(key("a"), spaces(), expired_at);
        cache.remove_if_expired(&key("a"), expired_at);
        assert_eq!(cache.get(&key("a"), expired_at), Some(spaces()));

        cache.remove_if_expired(&key("a"), expired_at + Duration::from_secs(30));
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_capacity_evicts_expired_then_oldest() {
        let cache = SpaceCache::new(2, Duration::from_secs(10));
        let now = Instant::now();
        cache.insert(key("a"), spaces(), now);
        cache.insert(key("b"), spaces(), now + Duration::from_secs(1));
        cache.insert(key("c"), spaces(), now + Duration::from_secs(2));
        let later = now + Duration::from_secs(3);
        assert_eq!(cache.get(&key("a"), later), None);
        assert!(cache.get(&key("b"), later).is_some());
        assert!(cache.get(&key("c"), later).is_some());

        cache.insert(key("d"), spaces(), now + Duration::from_secs(11));
        assert_eq!(cache.stats().size, 2);
        assert!(cache.get(&key("d"), now + Duration::from_secs(11)).is_some());
    }

    #[test]
    fn test_zero_capacity_raised() {
        assert_eq!(SpaceCache::new(0, Duration::from_secs(1)).stats().capacity, 1);
    }

    #[tokio::test]
    async fn test_caching_client_hits_provider_once() {
        let inner = Arc::new(CountingProvider::new(MemoryProvider::new(spaces())));
        let cache = Arc::new(SpaceCache::new(16, Duration::from_secs(60)));
        let client = CachingProviderClient::new("a:1", Arc::clone(&inner), cache);
        let ctx = RequestContext::new().with_user(User::new("marie"));
        let filters = [SpaceFilter::SpaceType("project".into())];

        let first = client.list_storage_spaces(&ctx, &filters).await.unwrap();
        let second = client.list_storage_spaces(&ctx, &filters).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.calls(), 1);

        client.list_storage_spaces(&ctx, &[]).await.unwrap();
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_refusals_not_cached() {
        let inner = Arc::new(CountingProvider::new(StatusProvider::new(
            StatusCode::Unavailable,
            "maintenance",
        )));
        let cache = Arc::new(SpaceCache::new(16, Duration::from_secs(60)));
        let client = CachingProviderClient::new("a:1", Arc::clone(&inner), Arc::clone(&cache));
        let ctx = RequestContext::new();

        for _ in 0..2 {
            let response = client.list_storage_spaces(&ctx, &[]).await.unwrap();
            assert!(!response.status.is_ok());
        }
        assert_eq!(inner.calls(), 2);
        assert_eq!(cache.stats().size, 0);
    }
}
