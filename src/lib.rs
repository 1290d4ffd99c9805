//! Edgestate
//!
//! Shared ephemeral state for read-heavy HTTP APIs:
//! - Result cache with TTL tiers, compute-and-cache and entity invalidation
//! - Distributed token-bucket admission control
//! - Credential revocation list
//!
//! Everything goes through one lazily connected store client (Redis or
//! in-process) and degrades to uncached, unthrottled operation when the
//! store is unavailable.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::SystemClock;
use infrastructure::store::StoreClient;
use tracing::info;

/// Builds the application state from configuration.
///
/// Fails on invalid configuration. The store itself is not contacted until
/// the first request needs it.
pub fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store = Arc::new(StoreClient::new(config.store.clone(), Arc::new(SystemClock)));
    let state = AppState::from_config(config, store)?;

    info!(
        backend = %config.store.backend,
        admission = config.admission.enabled,
        admin = state.admin_token.is_some(),
        "Application state created"
    );

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_app_state_defaults() {
        let state = create_app_state(&AppConfig::default()).unwrap();
        assert!(state.admin_token.is_none());
        assert_eq!(state.store.generation(), 0);
    }

    #[test]
    fn test_create_app_state_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.revocation.max_token_lifetime_secs = 0;

        assert!(create_app_state(&config).is_err());
    }
}
