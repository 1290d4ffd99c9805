//! Store factory for runtime backend selection

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::store::StoreBackend;
use crate::domain::{Clock, DomainError};

use super::in_memory::{InMemoryStore, InMemoryStoreConfig};
use super::redis::{RedisStore, RedisStoreConfig};

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local store using moka
    #[default]
    InMemory,
    /// Shared Redis store
    Redis,
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreType::InMemory => write!(f, "in_memory"),
            StoreType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(StoreType::InMemory),
            "redis" => Ok(StoreType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown store backend: {}. Valid backends: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for the shared store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to create
    #[serde(default)]
    pub backend: StoreType,
    /// Connection URL (required for Redis)
    #[serde(default)]
    pub url: Option<String>,
    /// Global key prefix for namespacing
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Upper bound on a single store call before it counts as a failure
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    /// Upper bound on establishing the backend connection
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long calls fail fast after a failed connect before redialing
    #[serde(default = "default_reconnect_cooldown_ms")]
    pub reconnect_cooldown_ms: u64,
    /// Maximum entries (in-memory only)
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

fn default_operation_timeout_ms() -> u64 {
    250
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_reconnect_cooldown_ms() -> u64 {
    1000
}

fn default_max_capacity() -> u64 {
    100_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreType::InMemory,
            url: None,
            key_prefix: None,
            operation_timeout_ms: default_operation_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_cooldown_ms: default_reconnect_cooldown_ms(),
            max_capacity: default_max_capacity(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: StoreType::Redis,
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_reconnect_cooldown(mut self, cooldown: Duration) -> Self {
        self.reconnect_cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.operation_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(DomainError::configuration(
                "store timeouts must be greater than zero",
            ));
        }

        if self.backend == StoreType::Redis && self.url.as_deref().is_none_or(str::is_empty) {
            return Err(DomainError::configuration(
                "store.url is required for the redis backend",
            ));
        }

        Ok(())
    }
}

/// Creates store backends from configuration
#[derive(Debug, Clone)]
pub struct StoreFactory {
    clock: Arc<dyn Clock>,
}

impl StoreFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub async fn create(
        &self,
        config: &StoreConfig,
    ) -> Result<Arc<dyn StoreBackend>, DomainError> {
        match config.backend {
            StoreType::InMemory => {
                let in_memory_config =
                    InMemoryStoreConfig::default().with_max_capacity(config.max_capacity);

                Ok(Arc::new(InMemoryStore::with_clock(
                    in_memory_config,
                    self.clock.clone(),
                )))
            }
            StoreType::Redis => {
                let url = config.url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for the redis backend")
                })?;

                let mut redis_config = RedisStoreConfig::new(url);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                Ok(Arc::new(RedisStore::connect(redis_config).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SystemClock;

    #[test]
    fn test_store_type_from_str() {
        assert_eq!("in_memory".parse::<StoreType>().unwrap(), StoreType::InMemory);
        assert_eq!("memory".parse::<StoreType>().unwrap(), StoreType::InMemory);
        assert_eq!("REDIS".parse::<StoreType>().unwrap(), StoreType::Redis);
        assert!("memcached".parse::<StoreType>().is_err());
    }

    #[test]
    fn test_store_type_display() {
        assert_eq!(StoreType::InMemory.to_string(), "in_memory");
        assert_eq!(StoreType::Redis.to_string(), "redis");
    }

    #[test]
    fn test_validate_redis_requires_url() {
        let config = StoreConfig {
            backend: StoreType::Redis,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(StoreConfig::redis("redis://localhost:6379").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = StoreConfig::in_memory().with_operation_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_factory_create_in_memory() {
        let factory = StoreFactory::new(Arc::new(SystemClock));
        let store = factory.create(&StoreConfig::in_memory()).await.unwrap();

        assert_eq!(store.name(), "in_memory");
        store
            .set_raw("test", "value", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get_raw("test").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_factory_redis_missing_url() {
        let factory = StoreFactory::new(Arc::new(SystemClock));
        let config = StoreConfig {
            backend: StoreType::Redis,
            url: None,
            ..Default::default()
        };

        assert!(factory.create(&config).await.is_err());
    }
}
