//! Shared request and response types

pub mod cache_control;
pub mod error;
pub mod json;

pub use cache_control::Cached;
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
