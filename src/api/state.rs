//! Application state for shared services

use std::sync::Arc;

use crate::config::{AdmissionConfig, AppConfig};
use crate::domain::DomainError;
use crate::infrastructure::rate_limit::RateLimiters;
use crate::infrastructure::services::{CacheService, RevocationService};
use crate::infrastructure::store::StoreClient;

/// Everything handlers and middleware reach the store through.
///
/// All services share the one [`StoreClient`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<StoreClient>,
    pub cache: Arc<CacheService>,
    pub rate_limiters: Arc<RateLimiters>,
    pub revocations: Arc<RevocationService>,
    pub admission: Arc<AdmissionConfig>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    /// Wires the services around an existing store client
    pub fn from_config(config: &AppConfig, store: Arc<StoreClient>) -> Result<Self, DomainError> {
        config.validate()?;

        let cache = Arc::new(CacheService::with_config(store.clone(), config.cache.clone()));
        let rate_limiters = Arc::new(RateLimiters::from_config(store.clone(), &config.rate_limit)?);
        let revocations = Arc::new(RevocationService::new(
            cache.clone(),
            config.revocation.clone(),
        ));

        Ok(Self {
            store,
            cache,
            rate_limiters,
            revocations,
            admission: Arc::new(config.admission.clone()),
            admin_token: config.admin.token.as_deref().map(Arc::from),
        })
    }
}
