//! In-memory store implementation using moka

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use tokio::sync::Mutex;

use crate::domain::rate_limit::{BucketOutcome, BucketPolicy, BucketState};
use crate::domain::store::{StoreBackend, glob_to_regex};
use crate::domain::{Clock, DomainError, SystemClock};

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

impl InMemoryStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Entry stored in moka
#[derive(Debug, Clone)]
struct StoreEntry {
    data: String,
    /// Expiration, as milliseconds since the epoch on the store's clock
    expires_at: u64,
    /// TTL requested by the writer; moka evicts on it
    ttl: Duration,
}

/// Evicts each entry after the TTL it was written with
struct EntryExpiry;

impl Expiry<String, StoreEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoreEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoreEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local store for development and tests.
///
/// Expiry is evaluated against the injected clock. Token-bucket steps are
/// serialized through a mutex so each read-refill-write runs as one unit.
#[derive(Debug)]
pub struct InMemoryStore {
    cache: MokaCache<String, StoreEntry>,
    clock: Arc<dyn Clock>,
    bucket_lock: Mutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: InMemoryStoreConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self {
            cache,
            clock,
            bucket_lock: Mutex::new(()),
        }
    }

    fn now_millis(&self) -> u64 {
        self.clock.now().as_millis() as u64
    }

    fn is_expired(&self, entry: &StoreEntry) -> bool {
        self.now_millis() >= entry.expires_at
    }

    async fn live_entry(&self, key: &str) -> Option<StoreEntry> {
        let entry = self.cache.get(key).await?;

        if self.is_expired(&entry) {
            self.cache.remove(key).await;
            return None;
        }

        Some(entry)
    }

    async fn insert(&self, key: &str, data: String, ttl: Duration) {
        let entry = StoreEntry {
            data,
            expires_at: self.now_millis() + ttl.as_millis() as u64,
            ttl,
        };

        self.cache.insert(key.to_string(), entry).await;
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.insert(key, value.to_string(), ttl).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let existed = self.live_entry(key).await.is_some();
        self.cache.remove(key).await;
        Ok(existed)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let regex = glob_to_regex(pattern)?;

        self.cache.run_pending_tasks().await;

        let keys_to_delete: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| regex.is_match(key.as_str()))
            .map(|(key, _)| key.to_string())
            .collect();

        let mut deleted = 0;

        for key in keys_to_delete {
            if let Some(entry) = self.cache.remove(&key).await {
                if !self.is_expired(&entry) {
                    deleted += 1;
                }
            }
        }

        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let now = self.now_millis();

        Ok(self
            .live_entry(key)
            .await
            .map(|entry| Duration::from_millis(entry.expires_at.saturating_sub(now))))
    }

    async fn take_token(
        &self,
        key: &str,
        policy: &BucketPolicy,
        now: Duration,
    ) -> Result<BucketOutcome, DomainError> {
        let _guard = self.bucket_lock.lock().await;

        let current = match self.live_entry(key).await {
            Some(entry) => Some(serde_json::from_str::<BucketState>(&entry.data).map_err(
                |e| DomainError::serialization(format!("Corrupt bucket state at '{}': {}", key, e)),
            )?),
            None => None,
        };

        let (outcome, next) = BucketState::take(current, policy, now.as_secs_f64());

        if let Some(next) = next {
            let data = serde_json::to_string(&next).map_err(|e| {
                DomainError::serialization(format!("Failed to encode bucket state: {}", e))
            })?;
            self.insert(key, data, policy.state_ttl()).await;
        }

        Ok(outcome)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManualClock;

    fn store_with_clock() -> (InMemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = InMemoryStore::with_clock(InMemoryStoreConfig::default(), clock.clone());
        (store, clock)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryStore::new();

        store
            .set_raw("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result = store.get_raw("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryStore::new();
        assert!(store.get_raw("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();

        store
            .set_raw("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.delete("key1").await.unwrap());
        assert!(store.get_raw("key1").await.unwrap().is_none());
        assert!(!store.delete("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let (store, clock) = store_with_clock();

        store
            .set_raw("key1", "value1", Duration::from_secs(300))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(299));
        assert!(store.exists("key1").await.unwrap());

        clock.advance(Duration::from_secs(1));
        assert!(store.get_raw("key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_remaining() {
        let (store, clock) = store_with_clock();

        store
            .set_raw("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(20));

        let ttl = store.ttl("key1").await.unwrap();
        assert_eq!(ttl, Some(Duration::from_secs(40)));
        assert!(store.ttl("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let store = InMemoryStore::new();
        let ttl = Duration::from_secs(60);

        store.set_raw("region:1", "a", ttl).await.unwrap();
        store.set_raw("region:1:summary", "b", ttl).await.unwrap();
        store.set_raw("region:1:children", "c", ttl).await.unwrap();
        store.set_raw("region:10:summary", "d", ttl).await.unwrap();

        let deleted = store.delete_pattern("region:1:*").await.unwrap();
        assert_eq!(deleted, 2);

        assert!(store.exists("region:1").await.unwrap());
        assert!(store.exists("region:10:summary").await.unwrap());
    }

    #[tokio::test]
    async fn test_take_token_exhausts_burst() {
        let (store, clock) = store_with_clock();
        let policy = BucketPolicy::new(60, 3);

        for _ in 0..3 {
            let outcome = store.take_token("rl:a", &policy, clock.now()).await.unwrap();
            assert!(outcome.allowed);
        }

        let outcome = store.take_token("rl:a", &policy, clock.now()).await.unwrap();
        assert!(!outcome.allowed);

        clock.advance(Duration::from_secs(1));
        let outcome = store.take_token("rl:a", &policy, clock.now()).await.unwrap();
        assert!(outcome.allowed);
    }

    #[tokio::test]
    async fn test_bucket_state_expires_when_idle() {
        let (store, clock) = store_with_clock();
        let policy = BucketPolicy::new(10, 5);

        store.take_token("rl:b", &policy, clock.now()).await.unwrap();
        assert!(store.exists("rl:b").await.unwrap());

        clock.advance(policy.state_ttl());
        assert!(!store.exists("rl:b").await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_outlive_a_day_when_written_that_way() {
        let (store, clock) = store_with_clock();
        let week = Duration::from_secs(7 * 86_400);

        store.set_raw("revoked_token:jti", "1", week).await.unwrap();
        clock.advance(Duration::from_secs(3 * 86_400));

        assert!(store.exists("revoked_token:jti").await.unwrap());
        assert_eq!(
            store.ttl("revoked_token:jti").await.unwrap(),
            Some(Duration::from_secs(4 * 86_400))
        );
    }

    #[tokio::test]
    async fn test_eviction_follows_each_entry_ttl() {
        let store = InMemoryStore::new();

        store
            .set_raw("short", "a", Duration::from_millis(50))
            .await
            .unwrap();
        store
            .set_raw("long", "b", Duration::from_secs(7 * 86_400))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        store.cache.run_pending_tasks().await;

        assert!(store.cache.get("short").await.is_none());
        assert!(store.cache.get("long").await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_take_token_never_over_admits() {
        let store = Arc::new(InMemoryStore::new());
        let policy = BucketPolicy::new(1, 10);
        let now = Duration::from_secs(1_700_000_000);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take_token("rl:c", &policy, now).await })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().allowed {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 10);
    }
}
