//! Token-bucket limiter backed by the shared store

use std::sync::Arc;

use tracing::warn;

use crate::domain::rate_limit::{BucketPolicy, RateLimitClass, RateLimitDecision};
use crate::infrastructure::store::StoreClient;

/// Prefix of every bucket key
pub const RATE_LIMIT_NAMESPACE: &str = "ratelimit";

/// One limiter instance: a policy and its own key namespace.
///
/// Bucket state lives in the store, so every process sharing the store
/// shares the quota. A store failure admits the request.
#[derive(Debug, Clone)]
pub struct TokenBucketLimiter {
    store: Arc<StoreClient>,
    policy: BucketPolicy,
    namespace: String,
}

impl TokenBucketLimiter {
    pub fn new(
        store: Arc<StoreClient>,
        policy: BucketPolicy,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            policy,
            namespace: namespace.into(),
        }
    }

    /// Limiter for an endpoint class, namespaced `ratelimit:<class>`
    pub fn for_class(
        store: Arc<StoreClient>,
        class: RateLimitClass,
        policy: BucketPolicy,
    ) -> Self {
        Self::new(
            store,
            policy,
            format!("{}:{}", RATE_LIMIT_NAMESPACE, class.as_str()),
        )
    }

    pub fn policy(&self) -> &BucketPolicy {
        &self.policy
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn bucket_key(&self, identifier: &str) -> String {
        format!("{}:{}", self.namespace, identifier)
    }

    /// Consumes one token for `identifier` if one is available
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        let key = self.bucket_key(identifier);

        match self.store.take_token(&key, &self.policy).await {
            Ok(outcome) => RateLimitDecision::from_outcome(&outcome, &self.policy),
            Err(e) => {
                warn!(
                    namespace = %self.namespace,
                    error = %e,
                    "Rate limit store unavailable, admitting request"
                );
                RateLimitDecision::fail_open(&self.policy)
            }
        }
    }

    pub async fn is_allowed(&self, identifier: &str) -> bool {
        self.check(identifier).await.allowed
    }
}
