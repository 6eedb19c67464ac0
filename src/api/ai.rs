use axum::extract::State;
use axum::Json;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::assistant::{self, Carousel, CarouselRequest, PlaygroundRequest, PlaygroundResponse};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn playground(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<PlaygroundRequest>,
) -> Result<Json<PlaygroundResponse>, ApiError> {
    Ok(Json(assistant::playground(&state, user_id, &req).await?))
}

pub async fn carousel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<CarouselRequest>,
) -> Result<Json<Carousel>, ApiError> {
    Ok(Json(assistant::generate_carousel(&state, user_id, &req).await?))
}
