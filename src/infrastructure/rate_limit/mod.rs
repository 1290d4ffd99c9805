//! Token-bucket limiters and their per-class registry

mod limiter;
mod registry;

pub use limiter::{RATE_LIMIT_NAMESPACE, TokenBucketLimiter};
pub use registry::{RateLimitConfig, RateLimiters, RouteClass, path_has_prefix};
