use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::db::{self, PromptVersion};
use crate::error::ApiError;
use crate::state::AppState;

const MAX_NAME_LEN: usize = 64;

fn check_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    let ok = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(name)
    } else {
        Err(ApiError::bad_request("invalid prompt name"))
    }
}

#[derive(Debug, Deserialize)]
pub struct NewVersion {
    pub content: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Rollback {
    pub version: i64,
}

pub async fn append(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(name): Path<String>,
    ApiJson(req): ApiJson<NewVersion>,
) -> Result<(StatusCode, Json<PromptVersion>), ApiError> {
    let name = check_name(&name)?;
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }
    let row = db::append_prompt_version(&state.pool, name, &req.content, req.note.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn latest(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<PromptVersion>, ApiError> {
    let name = check_name(&name)?;
    db::latest_prompt(&state.pool, name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("prompt"))
}

pub async fn versions(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(name): Path<String>,
) -> Result<Json<Vec<PromptVersion>>, ApiError> {
    let name = check_name(&name)?;
    Ok(Json(db::prompt_versions(&state.pool, name).await?))
}

pub async fn rollback(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(name): Path<String>,
    ApiJson(req): ApiJson<Rollback>,
) -> Result<(StatusCode, Json<PromptVersion>), ApiError> {
    let name = check_name(&name)?;
    db::rollback_prompt(&state.pool, name, req.version)
        .await?
        .map(|row| (StatusCode::CREATED, Json(row)))
        .ok_or_else(|| ApiError::NotFound(format!("prompt {name} v{} not found", req.version)))
}
