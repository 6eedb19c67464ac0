use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::byok::resolve_key;
use crate::error::ApiError;
use crate::imaging::decode_image;
use crate::model::KeyProvider;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RemoveBackgroundRequest {
    pub image_base64: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveBackgroundResponse {
    pub image_base64: String,
    pub mime_type: &'static str,
}

pub async fn remove_background(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<RemoveBackgroundRequest>,
) -> Result<Json<RemoveBackgroundResponse>, ApiError> {
    let image = decode_image(req.mime_type.trim(), &req.image_base64)?;
    let key = resolve_key(&state, user_id, KeyProvider::RemoveBg)
        .await?
        .ok_or_else(|| ApiError::Unavailable("background removal not configured".into()))?;
    let out = state.images.remove_background(&key.value, &image).await?;
    info!(user_id, in_bytes = image.len(), out_bytes = out.len(), "background removed");
    Ok(Json(RemoveBackgroundResponse {
        image_base64: B64.encode(out),
        mime_type: "image/png",
    }))
}
