//! Admission control in front of every route
//!
//! Requests outside the exemption list are charged one token against the
//! limiter chosen for their path. The caller is identified by the
//! authenticated [`Principal`] when one is present, otherwise by a digest
//! of the client address.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::api::types::error::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};
use crate::domain::cache::DIGEST_PREFIX_LEN;
use crate::infrastructure::rate_limit::path_has_prefix;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Authenticated caller, inserted into request extensions by the auth layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if !state.admission.enabled || is_exempt(path, &state.admission.exempt_paths) {
        return next.run(request).await;
    }

    let identifier = request_identifier(&request, state.admission.trust_forwarded_for);
    let (class, limiter) = state.rate_limiters.for_path(path);
    let decision = limiter.check(&identifier).await;

    if !decision.allowed {
        warn!(
            identifier = %identifier,
            class = %class,
            retry_after = decision.retry_after,
            "Request denied by admission control"
        );
        return ApiError::rate_limited(&decision).into_response();
    }

    debug!(class = %class, remaining = decision.remaining, "Request admitted");

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_LIMIT),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_REMAINING),
        HeaderValue::from(decision.remaining),
    );

    response
}

fn is_exempt(path: &str, exempt_paths: &[String]) -> bool {
    exempt_paths
        .iter()
        .any(|prefix| path_has_prefix(path, prefix))
}

/// Limiter key for the request: `user:<principal>` or `ip:<digest>`
pub fn request_identifier(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    if let Some(Principal(id)) = request.extensions().get::<Principal>() {
        return format!("user:{}", id);
    }

    let forwarded = trust_forwarded_for
        .then(|| forwarded_for(request.headers()))
        .flatten();

    let address = forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    });

    format!("ip:{}", address_digest(address.as_deref().unwrap_or("unknown")))
}

/// First entry of `X-Forwarded-For`, the originating client
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .map(str::to_string)
}

fn address_digest(address: &str) -> String {
    let mut digest = hex::encode(Sha256::digest(address.as_bytes()));
    digest.truncate(DIGEST_PREFIX_LEN);
    digest
}
