//! Shared store backends and the process-wide client

mod client;
mod factory;
mod in_memory;
mod redis;

pub use client::StoreClient;
pub use factory::{StoreConfig, StoreFactory, StoreType};
pub use in_memory::{InMemoryStore, InMemoryStoreConfig};
pub use redis::{RedisStore, RedisStoreConfig};
