use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::error::ApiError;
use crate::extension::{apply_sync, SyncError, SyncResult};
use crate::model::SyncType;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

pub async fn sync(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(msg): ApiJson<SyncMessage>,
) -> Result<Json<SyncResult>, ApiError> {
    let kind = SyncType::parse(msg.kind.trim())
        .ok_or_else(|| ApiError::bad_request(format!("unknown sync type {}", msg.kind)))?;
    match apply_sync(&state.pool, user_id, kind, msg.data).await {
        Ok(res) => Ok(Json(res)),
        Err(SyncError::Invalid(msg)) => Err(ApiError::BadRequest(msg)),
        Err(SyncError::Internal(err)) => Err(ApiError::Internal(err)),
    }
}
