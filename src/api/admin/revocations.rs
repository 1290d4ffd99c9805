//! Credential revocation admin endpoints

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    pub token_id: String,
    /// Credential expiry; the maximum lifetime applies when omitted
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationStatus {
    pub token_id: String,
    pub revoked: bool,
}

/// POST /admin/revocations
pub async fn revoke(
    State(state): State<AppState>,
    _: RequireAdmin,
    Json(request): Json<RevokeRequest>,
) -> Result<Json<RevocationStatus>, ApiError> {
    if request.token_id.trim().is_empty() {
        return Err(ApiError::bad_request("token_id must not be empty"));
    }

    let recorded = match request.expires_at {
        Some(expires_at) => {
            state
                .revocations
                .revoke_until(&request.token_id, expires_at)
                .await
        }
        None => state.revocations.revoke(&request.token_id).await,
    };

    if !recorded {
        return Err(ApiError::unavailable("Revocation could not be recorded"));
    }

    Ok(Json(RevocationStatus {
        token_id: request.token_id,
        revoked: true,
    }))
}

/// GET /admin/revocations/{token_id}
pub async fn status(
    State(state): State<AppState>,
    _: RequireAdmin,
    Path(token_id): Path<String>,
) -> Result<Json<RevocationStatus>, ApiError> {
    let revoked = state.revocations.is_revoked(&token_id).await;

    Ok(Json(RevocationStatus { token_id, revoked }))
}
