//! Rate limiting domain - token bucket policy, state and decisions

mod bucket;

pub use bucket::{BucketOutcome, BucketPolicy, BucketState};

use serde::{Deserialize, Serialize};

/// Endpoint classes with independently configured limiters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitClass {
    /// General read traffic
    #[default]
    Default,
    /// Credential and login style endpoints
    Auth,
    /// Search endpoints
    Search,
}

impl RateLimitClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Auth => "auth",
            Self::Search => "search",
        }
    }
}

impl std::fmt::Display for RateLimitClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Burst capacity of the limiter
    pub limit: u32,
    /// Whole tokens left after this request
    pub remaining: u32,
    /// Seconds to wait before retrying, set on rejection
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    /// Builds a decision from a bucket step
    pub fn from_outcome(outcome: &BucketOutcome, policy: &BucketPolicy) -> Self {
        let remaining = outcome.tokens.max(0.0).floor() as u32;

        if outcome.allowed {
            Self {
                allowed: true,
                limit: policy.burst,
                remaining,
                retry_after: None,
            }
        } else {
            Self {
                allowed: false,
                limit: policy.burst,
                remaining: 0,
                retry_after: Some(policy.retry_after_secs(outcome.tokens)),
            }
        }
    }

    /// Decision used when the store cannot be consulted
    pub fn fail_open(policy: &BucketPolicy) -> Self {
        Self {
            allowed: true,
            limit: policy.burst,
            remaining: policy.burst,
            retry_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_rejection() {
        let policy = BucketPolicy::new(10, 5);
        let outcome = BucketOutcome {
            allowed: false,
            tokens: 0.0,
        };

        let decision = RateLimitDecision::from_outcome(&outcome, &policy);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, Some(6));
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.limit, 5);
    }

    #[test]
    fn test_decision_from_admission() {
        let policy = BucketPolicy::new(10, 5);
        let outcome = BucketOutcome {
            allowed: true,
            tokens: 3.4,
        };

        let decision = RateLimitDecision::from_outcome(&outcome, &policy);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 3);
        assert!(decision.retry_after.is_none());
    }

    #[test]
    fn test_class_serde() {
        let class: RateLimitClass = serde_json::from_str("\"search\"").unwrap();
        assert_eq!(class, RateLimitClass::Search);
        assert_eq!(RateLimitClass::Auth.to_string(), "auth");
    }
}
