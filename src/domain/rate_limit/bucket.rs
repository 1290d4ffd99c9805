//! Token bucket arithmetic
//!
//! Pure refill/consume/retry-after computation shared by every store
//! backend. The Redis backend runs the same steps inside a Lua script.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Minimum lifetime of stored bucket state, in seconds
const MIN_STATE_TTL_SECS: u64 = 60;

/// Multiple of the full-refill window that idle state is kept for
const STATE_TTL_MULTIPLIER: u64 = 2;

/// Sustained rate and burst capacity of one limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicy {
    /// Sustained requests per minute
    pub requests_per_minute: u32,
    /// Maximum tokens a bucket can hold
    pub burst: u32,
}

impl BucketPolicy {
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        Self {
            requests_per_minute,
            burst,
        }
    }

    /// Rejects policies that would block or admit everything
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.requests_per_minute == 0 {
            return Err(DomainError::configuration(
                "requests_per_minute must be greater than zero",
            ));
        }

        if self.burst == 0 {
            return Err(DomainError::configuration("burst must be at least 1"));
        }

        Ok(())
    }

    /// Tokens after `elapsed_secs` of refill, capped at the burst capacity
    pub fn refill(&self, tokens: f64, elapsed_secs: f64) -> f64 {
        let gained = elapsed_secs.max(0.0) * f64::from(self.requests_per_minute) / 60.0;
        (tokens + gained).min(f64::from(self.burst))
    }

    /// Whole seconds until one token is available again; never zero
    pub fn retry_after_secs(&self, tokens: f64) -> u64 {
        let missing = (1.0 - tokens).max(0.0);
        let secs = (missing * 60.0 / f64::from(self.requests_per_minute)).ceil();
        (secs as u64).max(1)
    }

    /// Expiry applied to stored state so idle identifiers are collected
    pub fn state_ttl(&self) -> Duration {
        let full_refill =
            (u64::from(self.burst) * 60).div_ceil(u64::from(self.requests_per_minute.max(1)));
        Duration::from_secs(full_refill.max(MIN_STATE_TTL_SECS) * STATE_TTL_MULTIPLIER)
    }
}

/// Stored per-identifier bucket state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketState {
    /// Tokens currently held, in `[0, burst]`
    pub tokens: f64,
    /// Unix time of the last successful consumption, in seconds
    pub last_update: f64,
}

/// Result of one read-refill-consume step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketOutcome {
    /// Whether a token was consumed
    pub allowed: bool,
    /// Tokens left after refill (and consumption when allowed)
    pub tokens: f64,
}

impl BucketState {
    /// A fresh bucket holding the full burst capacity
    pub fn full(policy: &BucketPolicy, now: f64) -> Self {
        Self {
            tokens: f64::from(policy.burst),
            last_update: now,
        }
    }

    /// Runs one admission step.
    ///
    /// Returns the outcome and, when a token was consumed, the state to
    /// persist. Rejections leave the stored state untouched.
    pub fn take(
        current: Option<Self>,
        policy: &BucketPolicy,
        now: f64,
    ) -> (BucketOutcome, Option<Self>) {
        let state = current.unwrap_or_else(|| Self::full(policy, now));
        let tokens = policy.refill(state.tokens, now - state.last_update);

        if tokens >= 1.0 {
            let remaining = tokens - 1.0;
            let next = Self {
                tokens: remaining,
                last_update: now,
            };

            (
                BucketOutcome {
                    allowed: true,
                    tokens: remaining,
                },
                Some(next),
            )
        } else {
            (
                BucketOutcome {
                    allowed: false,
                    tokens,
                },
                None,
            )
        }
    }
}
