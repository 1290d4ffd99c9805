//! Admin API for cache invalidation and credential revocation

pub mod cache;
pub mod revocations;

use axum::{
    Router,
    routing::{delete, get, post},
};

use super::state::AppState;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/cache", delete(cache::delete_matching))
        .route("/cache/{entity_type}", delete(cache::invalidate_entity_type))
        .route(
            "/cache/{entity_type}/{entity_id}",
            delete(cache::invalidate_entity),
        )
        .route("/revocations", post(revocations::revoke))
        .route("/revocations/{token_id}", get(revocations::status))
}
