use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::db::{self, CancelOutcome, ScheduledPost};
use crate::error::ApiError;
use crate::model::Visibility;
use crate::state::AppState;

pub const MAX_POST_CHARS: usize = 3000;

#[derive(Debug, Deserialize)]
pub struct SchedulePost {
    pub content: String,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<SchedulePost>,
) -> Result<(StatusCode, Json<ScheduledPost>), ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }
    if content.chars().count() > MAX_POST_CHARS {
        return Err(ApiError::bad_request("content exceeds 3000 characters"));
    }
    if req.scheduled_for <= Utc::now() {
        return Err(ApiError::bad_request("scheduled_for must be in the future"));
    }
    let visibility = req.visibility.unwrap_or(Visibility::Anyone);
    let post =
        db::insert_scheduled_post(&state.pool, user_id, content, req.scheduled_for, visibility)
            .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ScheduledPost>>, ApiError> {
    Ok(Json(db::list_scheduled_posts(&state.pool, user_id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ScheduledPost>, ApiError> {
    match db::cancel_scheduled_post(&state.pool, user_id, id).await? {
        CancelOutcome::Cancelled(post) => Ok(Json(*post)),
        CancelOutcome::NotFound => Err(ApiError::not_found("scheduled post")),
        CancelOutcome::NotPending(status) => Err(ApiError::Conflict(format!(
            "post is {status} and can no longer be cancelled"
        ))),
    }
}
