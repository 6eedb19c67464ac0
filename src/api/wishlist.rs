use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::db::{self, WishlistItem};
use crate::error::ApiError;
use crate::state::AppState;

const MAX_CONTENT_CHARS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct AddWishlistItem {
    pub content: String,
    pub author_name: Option<String>,
    pub source_url: Option<String>,
}

pub async fn add(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<AddWishlistItem>,
) -> Result<(StatusCode, Json<WishlistItem>), ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::PayloadTooLarge("content is too long".into()));
    }
    let author = req.author_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let source = req.source_url.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match db::insert_wishlist_item(&state.pool, user_id, content, author, source).await {
        Ok(item) => Ok((StatusCode::CREATED, Json(item))),
        Err(err) if db::is_unique_violation(&err) => {
            Err(ApiError::Conflict("post is already in your wishlist".into()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<WishlistItem>>, ApiError> {
    Ok(Json(db::list_wishlist(&state.pool, user_id).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if db::delete_wishlist_item(&state.pool, user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("wishlist item"))
    }
}
