//! Revoked credential list

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::DomainError;

use super::cache_service::CacheService;

const REVOCATION_NAMESPACE: &str = "revoked_token";

/// What `is_revoked` answers when the store cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Treat the credential as valid
    #[default]
    FailOpen,
    /// Treat the credential as revoked
    FailClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    /// Longest lifetime any issued credential can have
    #[serde(default = "default_max_token_lifetime_secs")]
    pub max_token_lifetime_secs: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_max_token_lifetime_secs() -> u64 {
    3600
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            max_token_lifetime_secs: default_max_token_lifetime_secs(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl RevocationConfig {
    pub fn max_token_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_token_lifetime_secs)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_token_lifetime_secs == 0 {
            return Err(DomainError::configuration(
                "revocation.max_token_lifetime_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Records credentials that must no longer be honoured.
///
/// Entries live exactly as long as the credential could still be presented
/// and are never deleted explicitly.
#[derive(Debug)]
pub struct RevocationService {
    cache: Arc<CacheService>,
    config: RevocationConfig,
}

impl RevocationService {
    pub fn new(cache: Arc<CacheService>, config: RevocationConfig) -> Self {
        Self { cache, config }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }

    fn key(token_id: &str) -> String {
        format!("{}:{}", REVOCATION_NAMESPACE, token_id)
    }

    /// Revokes a credential for the full maximum lifetime
    pub async fn revoke(&self, token_id: &str) -> bool {
        self.write(token_id, self.config.max_token_lifetime()).await
    }

    /// Revokes a credential until its own expiry. Credentials that have
    /// already expired are not written and report `true`.
    pub async fn revoke_until(&self, token_id: &str, expires_at: DateTime<Utc>) -> bool {
        let now = DateTime::<Utc>::from(
            std::time::UNIX_EPOCH + self.cache.store().clock().now(),
        );

        let remaining = match (expires_at - now).to_std() {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => {
                info!(token_id, %expires_at, "Credential already expired, nothing to revoke");
                return true;
            }
        };

        let ttl = remaining.min(self.config.max_token_lifetime());
        self.write(token_id, round_up_to_secs(ttl)).await
    }

    async fn write(&self, token_id: &str, ttl: Duration) -> bool {
        let written = self.cache.set(&Self::key(token_id), &true, ttl).await;

        if written {
            info!(token_id, ttl_secs = ttl.as_secs(), "Credential revoked");
        }

        written
    }

    /// Whether the credential has been revoked. Store failures resolve
    /// according to the configured failure policy.
    pub async fn is_revoked(&self, token_id: &str) -> bool {
        match self.cache.contains(&Self::key(token_id)).await {
            Ok(revoked) => revoked,
            Err(e) => {
                let revoked = self.config.failure_policy == FailurePolicy::FailClosed;
                warn!(
                    token_id,
                    error = %e,
                    policy = ?self.config.failure_policy,
                    "Revocation lookup failed"
                );
                revoked
            }
        }
    }
}

fn round_up_to_secs(ttl: Duration) -> Duration {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    Duration::from_secs(secs)
}
