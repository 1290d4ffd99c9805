//! Services built on the shared store

mod cache_service;
mod revocation_service;

pub use cache_service::{CacheService, CacheServiceConfig};
pub use revocation_service::{FailurePolicy, RevocationConfig, RevocationService};
