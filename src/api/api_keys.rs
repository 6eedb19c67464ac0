use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::crypto::key_hint;
use crate::db::{self, StoredApiKey};
use crate::error::ApiError;
use crate::model::KeyProvider;
use crate::state::AppState;

const MIN_KEY_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct PutApiKey {
    pub provider: String,
    pub api_key: String,
}

/// What clients see of a stored key.
#[derive(Debug, Serialize)]
pub struct ApiKeyView {
    pub provider: String,
    pub key_hint: String,
    pub is_valid: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredApiKey> for ApiKeyView {
    fn from(k: StoredApiKey) -> Self {
        Self {
            provider: k.provider,
            key_hint: k.key_hint,
            is_valid: k.is_valid,
            updated_at: k.updated_at,
        }
    }
}

fn parse_provider(raw: &str) -> Result<KeyProvider, ApiError> {
    KeyProvider::parse(raw.trim())
        .ok_or_else(|| ApiError::bad_request(format!("unknown provider {raw}")))
}

pub async fn put(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<PutApiKey>,
) -> Result<Json<ApiKeyView>, ApiError> {
    let provider = parse_provider(&req.provider)?;
    let key = req.api_key.trim();
    if key.chars().count() < MIN_KEY_LEN {
        return Err(ApiError::bad_request("api_key is too short"));
    }
    let cipher = state
        .cipher
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("key storage is not configured".into()))?;
    let sealed = cipher
        .seal(key)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
    let hint = key_hint(key);
    db::upsert_api_key(&state.pool, user_id, provider, &sealed, &hint).await?;
    info!(user_id, provider = provider.as_str(), "api key stored");
    Ok(Json(ApiKeyView {
        provider: provider.as_str().to_string(),
        key_hint: hint,
        is_valid: true,
        updated_at: Utc::now(),
    }))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ApiKeyView>>, ApiError> {
    let keys = db::list_api_keys(&state.pool, user_id).await?;
    Ok(Json(keys.into_iter().map(ApiKeyView::from).collect()))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(provider): Path<String>,
) -> Result<StatusCode, ApiError> {
    let provider = parse_provider(&provider)?;
    if db::delete_api_key(&state.pool, user_id, provider).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("api key"))
    }
}
