//! Responses advertising their cache lifetime to intermediaries

use axum::{
    Json,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::TtlTier;

/// JSON body plus `Cache-Control: public, max-age=<tier seconds>`
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub body: T,
    pub tier: TtlTier,
}

impl<T> Cached<T> {
    pub fn new(body: T, tier: TtlTier) -> Self {
        Self { body, tier }
    }
}

impl<T: Serialize> IntoResponse for Cached<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();

        if let Ok(value) = HeaderValue::from_str(&self.tier.cache_control()) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }

        response
    }
}
