//! Cache domain - key construction and TTL catalog

mod key;
mod ttl;

pub use key::{CacheKeyParams, DEFAULT_MAX_KEY_LENGTH, DIGEST_PREFIX_LEN, KEY_DELIMITER, KeyBuilder};
pub use ttl::{TtlPolicy, TtlTier};
