//! Infrastructure layer - store backends, services and limiters

pub mod logging;
pub mod rate_limit;
pub mod services;
pub mod store;
