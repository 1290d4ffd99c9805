//! API middleware components

pub mod admin_auth;
pub mod admission;

pub use admin_auth::RequireAdmin;
pub use admission::{Principal, admission_middleware, request_identifier};
