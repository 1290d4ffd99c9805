//! Shared store client
//!
//! Owns the one backend connection of the process. The backend is created
//! lazily on first use, reused by every caller, and torn down explicitly
//! with [`StoreClient::release`]. Every call, including the connect it may
//! trigger, is bounded by the configured operation timeout; a timeout
//! surfaces as a store error.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::domain::rate_limit::{BucketOutcome, BucketPolicy};
use crate::domain::store::StoreBackend;
use crate::domain::{Clock, DomainError};

use super::factory::{StoreConfig, StoreFactory};

pub struct StoreClient {
    config: StoreConfig,
    factory: StoreFactory,
    clock: Arc<dyn Clock>,
    connection: Arc<Connection>,
}

/// Backend slot, shared with connect attempts running in the background
struct Connection {
    backend: RwLock<Option<Arc<dyn StoreBackend>>>,
    connecting: Mutex<()>,
    /// Clock millis of the last failed connect, 0 when none
    failed_at_ms: AtomicU64,
    generation: AtomicU64,
}

impl Connection {
    fn new(backend: Option<Arc<dyn StoreBackend>>) -> Self {
        let generation = u64::from(backend.is_some());

        Self {
            backend: RwLock::new(backend),
            connecting: Mutex::new(()),
            failed_at_ms: AtomicU64::new(0),
            generation: AtomicU64::new(generation),
        }
    }

    async fn current(&self) -> Option<Arc<dyn StoreBackend>> {
        self.backend.read().await.clone()
    }

    fn check_cooldown(&self, config: &StoreConfig, clock: &dyn Clock) -> Result<(), DomainError> {
        let failed_at = self.failed_at_ms.load(Ordering::SeqCst);
        if failed_at == 0 {
            return Ok(());
        }

        let now = clock.now().as_millis() as u64;
        let retry_at = failed_at.saturating_add(config.reconnect_cooldown_ms);

        if now < retry_at {
            return Err(DomainError::store(format!(
                "{} store unreachable; next connection attempt in {}ms",
                config.backend,
                retry_at - now
            )));
        }

        Ok(())
    }

    /// Connects once; concurrent attempts queue on `connecting` and reuse
    /// the winner's backend or its failure.
    async fn connect(
        &self,
        factory: &StoreFactory,
        config: &StoreConfig,
        clock: &dyn Clock,
    ) -> Result<Arc<dyn StoreBackend>, DomainError> {
        let _guard = self.connecting.lock().await;

        if let Some(backend) = self.current().await {
            return Ok(backend);
        }
        self.check_cooldown(config, clock)?;

        let attempt = tokio::time::timeout(config.connect_timeout(), factory.create(config));
        let result = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(DomainError::store(format!(
                "Connecting to {} store timed out after {:?}",
                config.backend,
                config.connect_timeout()
            ))),
        };

        match result {
            Ok(backend) => {
                self.failed_at_ms.store(0, Ordering::SeqCst);
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                info!(backend = backend.name(), generation, "Store backend created");

                *self.backend.write().await = Some(backend.clone());
                Ok(backend)
            }
            Err(e) => {
                let now = (clock.now().as_millis() as u64).max(1);
                self.failed_at_ms.store(now, Ordering::SeqCst);
                warn!(
                    backend = %config.backend,
                    error = %e,
                    cooldown_ms = config.reconnect_cooldown_ms,
                    "Store connection failed"
                );
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("config", &self.config)
            .field("generation", &self.generation())
            .finish()
    }
}

impl StoreClient {
    /// Creates a client; no connection is made until the first call
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            factory: StoreFactory::new(clock.clone()),
            config,
            clock,
            connection: Arc::new(Connection::new(None)),
        }
    }

    /// Creates a client around an already constructed backend
    pub fn with_backend(
        backend: Arc<dyn StoreBackend>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            factory: StoreFactory::new(clock.clone()),
            config,
            clock,
            connection: Arc::new(Connection::new(Some(backend))),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of backends created over the client's lifetime
    pub fn generation(&self) -> u64 {
        self.connection.generation.load(Ordering::SeqCst)
    }

    /// Returns the live backend, creating it on first call.
    ///
    /// Only one connect runs at a time and it runs detached from the
    /// caller, so a caller that gives up does not abandon the attempt.
    /// After a failed connect, calls fail fast until the reconnect
    /// cooldown has passed.
    pub async fn acquire(&self) -> Result<Arc<dyn StoreBackend>, DomainError> {
        if let Some(backend) = self.connection.current().await {
            return Ok(backend);
        }
        self.connection.check_cooldown(&self.config, &*self.clock)?;

        let connection = self.connection.clone();
        let factory = self.factory.clone();
        let config = self.config.clone();
        let clock = self.clock.clone();

        tokio::spawn(async move { connection.connect(&factory, &config, &*clock).await })
            .await
            .map_err(|e| DomainError::internal(format!("Store connect task failed: {}", e)))?
    }

    /// Drops the backend; the next call re-creates it
    pub async fn release(&self) {
        self.connection.failed_at_ms.store(0, Ordering::SeqCst);

        if let Some(backend) = self.connection.backend.write().await.take() {
            info!(
                backend = backend.name(),
                generation = self.generation(),
                "Store backend released"
            );
        }
    }

    /// Whether a backend is currently held
    pub async fn is_connected(&self) -> bool {
        self.connection.current().await.is_some()
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(Arc<dyn StoreBackend>) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let timeout = self.config.operation_timeout();
        let call = async {
            let backend = self.acquire().await?;
            f(backend).await
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, ?timeout, "Store call timed out");
                Err(DomainError::store(format!(
                    "{} timed out after {:?}",
                    operation, timeout
                )))
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.run("get", |backend| async move { backend.get_raw(key).await })
            .await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        if ttl.is_zero() {
            return Err(DomainError::validation("Cache writes require a non-zero TTL"));
        }

        self.run("set", |backend| async move {
            backend.set_raw(key, value, ttl).await
        })
        .await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        self.run("delete", |backend| async move { backend.delete(key).await })
            .await
    }

    pub async fn delete_matching(&self, pattern: &str) -> Result<usize, DomainError> {
        self.run("delete_matching", |backend| async move {
            backend.delete_pattern(pattern).await
        })
        .await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        self.run("exists", |backend| async move { backend.exists(key).await })
            .await
    }

    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        self.run("ttl", |backend| async move { backend.ttl(key).await })
            .await
    }

    /// Runs one token-bucket step at the client's current time
    pub async fn take_token(
        &self,
        key: &str,
        policy: &BucketPolicy,
    ) -> Result<BucketOutcome, DomainError> {
        let now = self.clock.now();

        self.run("take_token", |backend| async move {
            backend.take_token(key, policy, now).await
        })
        .await
    }

    pub async fn ping(&self) -> Result<(), DomainError> {
        self.run("ping", |backend| async move { backend.ping().await })
            .await
    }
}
