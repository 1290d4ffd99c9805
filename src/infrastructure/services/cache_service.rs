//! Cache facade over the shared store
//!
//! Every read and write goes through the [`StoreClient`]. Store and
//! serialization failures never reach the caller: reads degrade to a miss,
//! writes and deletes report `false` or `0`, and the failure is logged.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::cache::{CacheKeyParams, KeyBuilder, TtlPolicy, TtlTier, DEFAULT_MAX_KEY_LENGTH};
use crate::domain::store::escape_glob;
use crate::domain::DomainError;
use crate::infrastructure::store::StoreClient;

/// Configuration for the cache facade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheServiceConfig {
    /// Length above which keys collapse to a digest
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,
    /// Category to TTL tier table
    #[serde(flatten)]
    pub ttl_policy: TtlPolicy,
    /// Namespaces derived from entity state, purged on every invalidation
    #[serde(default = "default_aggregate_namespaces")]
    pub aggregate_namespaces: Vec<String>,
}

fn default_max_key_length() -> usize {
    DEFAULT_MAX_KEY_LENGTH
}

fn default_aggregate_namespaces() -> Vec<String> {
    vec!["stats".to_string()]
}

impl Default for CacheServiceConfig {
    fn default() -> Self {
        Self {
            max_key_length: default_max_key_length(),
            ttl_policy: TtlPolicy::default(),
            aggregate_namespaces: default_aggregate_namespaces(),
        }
    }
}

impl CacheServiceConfig {
    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    pub fn with_ttl_policy(mut self, ttl_policy: TtlPolicy) -> Self {
        self.ttl_policy = ttl_policy;
        self
    }

    pub fn with_aggregate_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregate_namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_key_length < 64 {
            return Err(DomainError::configuration(format!(
                "cache.max_key_length must be at least 64, got {}",
                self.max_key_length
            )));
        }

        if self.aggregate_namespaces.iter().any(|ns| ns.is_empty()) {
            return Err(DomainError::configuration(
                "cache.aggregate_namespaces must not contain empty names",
            ));
        }

        Ok(())
    }
}

/// The only sanctioned path for cached computation results
#[derive(Debug)]
pub struct CacheService {
    store: Arc<StoreClient>,
    keys: KeyBuilder,
    config: CacheServiceConfig,
}

impl CacheService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self::with_config(store, CacheServiceConfig::default())
    }

    pub fn with_config(store: Arc<StoreClient>, config: CacheServiceConfig) -> Self {
        Self {
            store,
            keys: KeyBuilder::new(config.max_key_length),
            config,
        }
    }

    pub fn store(&self) -> &Arc<StoreClient> {
        &self.store
    }

    /// Builds the key for `namespace` and `params`
    pub fn key(&self, namespace: &str, params: &CacheKeyParams) -> String {
        self.keys.build(namespace, params)
    }

    pub fn tier_for(&self, category: &str) -> TtlTier {
        self.config.ttl_policy.tier_for(category)
    }

    pub fn ttl_for(&self, category: &str) -> Duration {
        self.config.ttl_policy.ttl_for(category)
    }

    /// Reads and decodes a value; any failure is a miss
    pub async fn get<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached value could not be decoded, treating as miss");
                None
            }
        }
    }

    /// Encodes and writes a value; returns whether the write landed
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Duration) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Value could not be encoded for caching");
                return false;
            }
        };

        match self.store.set(key, &raw, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Cache write failed");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Deletes every key matching a glob pattern; returns how many went
    pub async fn delete_matching(&self, pattern: &str) -> usize {
        match self.store.delete_matching(pattern).await {
            Ok(deleted) => {
                debug!(pattern, deleted, "Cache pattern deleted");
                deleted
            }
            Err(e) => {
                warn!(pattern, error = %e, "Cache pattern delete failed");
                0
            }
        }
    }

    /// Whether a live entry exists under `key`.
    ///
    /// Unlike the other operations this surfaces store failures, so callers
    /// with a stricter failure policy can decide for themselves.
    pub async fn contains(&self, key: &str) -> Result<bool, DomainError> {
        self.store.exists(key).await
    }

    /// Returns the cached value under `key`, or runs `compute` and caches
    /// its result. Errors from `compute` are returned and never cached.
    pub async fn resolve<V, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(cached) = self.get(key).await {
            debug!(key, "Cache hit");
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, ttl).await;

        Ok(value)
    }

    /// [`resolve`](Self::resolve) with the key derived from `namespace`
    /// and the cacheable arguments
    pub async fn resolve_with<V, E, F, Fut>(
        &self,
        namespace: &str,
        params: &CacheKeyParams,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = self.key(namespace, params);
        self.resolve(&key, ttl, compute).await
    }

    /// [`resolve_with`](Self::resolve_with) using the TTL configured for
    /// a data category
    pub async fn resolve_category<V, E, F, Fut>(
        &self,
        category: &str,
        namespace: &str,
        params: &CacheKeyParams,
        compute: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let ttl = self.ttl_for(category);
        self.resolve_with(namespace, params, ttl, compute).await
    }

    /// Evicts everything derived from one entity, or from every entity of
    /// a type when `entity_id` is `None`, plus the aggregate namespaces.
    pub async fn invalidate_entity(&self, entity_type: &str, entity_id: Option<&str>) -> usize {
        let scope = match entity_id {
            Some(id) => format!("{}:{}", entity_type, id),
            None => entity_type.to_string(),
        };

        let purges = std::iter::once(scope.as_str())
            .chain(self.config.aggregate_namespaces.iter().map(String::as_str))
            .map(|namespace| self.purge_namespace(namespace));

        let deleted: usize = join_all(purges).await.into_iter().sum();

        info!(entity_type, entity_id, deleted, "Entity cache invalidated");
        deleted
    }

    async fn purge_namespace(&self, namespace: &str) -> usize {
        let direct = usize::from(self.delete(namespace).await);
        let pattern = format!("{}:*", escape_glob(namespace));

        direct + self.delete_matching(&pattern).await
    }
}
