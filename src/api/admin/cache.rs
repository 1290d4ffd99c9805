//! Cache invalidation admin endpoints

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::store::glob_to_regex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternQuery {
    pub pattern: String,
}

/// DELETE /admin/cache/{entity_type}
pub async fn invalidate_entity_type(
    State(state): State<AppState>,
    _: RequireAdmin,
    Path(entity_type): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state.cache.invalidate_entity(&entity_type, None).await;

    Ok(Json(DeletedResponse { deleted }))
}

/// DELETE /admin/cache/{entity_type}/{entity_id}
pub async fn invalidate_entity(
    State(state): State<AppState>,
    _: RequireAdmin,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state
        .cache
        .invalidate_entity(&entity_type, Some(&entity_id))
        .await;

    Ok(Json(DeletedResponse { deleted }))
}

/// DELETE /admin/cache?pattern=<glob>
pub async fn delete_matching(
    State(state): State<AppState>,
    _: RequireAdmin,
    Query(query): Query<PatternQuery>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if query.pattern.trim().is_empty() {
        return Err(ApiError::bad_request("pattern must not be empty").with_code("invalid_pattern"));
    }

    glob_to_regex(&query.pattern)
        .map_err(|e| ApiError::bad_request(e.to_string()).with_code("invalid_pattern"))?;

    let deleted = state.cache.delete_matching(&query.pattern).await;
    info!(pattern = %query.pattern, deleted, "Admin pattern invalidation");

    Ok(Json(DeletedResponse { deleted }))
}
