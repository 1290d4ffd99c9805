//! Domain layer - keys, TTL catalog, token bucket and store contract

pub mod cache;
pub mod clock;
pub mod error;
pub mod rate_limit;
pub mod store;

pub use cache::{CacheKeyParams, KeyBuilder, TtlPolicy, TtlTier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
pub use rate_limit::{BucketOutcome, BucketPolicy, BucketState, RateLimitClass, RateLimitDecision};
pub use store::StoreBackend;
