use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::db::{self, NewsArticle};
use crate::error::ApiError;
use crate::seed::{SeedOutcome, SeedRequest, Seeder};
use crate::state::AppState;

pub async fn seed(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiJson(req): ApiJson<SeedRequest>,
) -> Result<Json<SeedOutcome>, ApiError> {
    let seeder = Seeder {
        pool: &state.pool,
        search: &state.search,
        dispatcher: state.dispatcher.as_ref(),
        dedup_window_hours: state.cfg.discover.dedup_window_hours,
        max_articles_per_topic: state.cfg.discover.max_articles_per_topic,
    };
    Ok(Json(seeder.seed(&req).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub topic: Option<String>,
    pub limit: Option<i64>,
}

pub async fn news(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(q): Query<NewsQuery>,
) -> Result<Json<Vec<NewsArticle>>, ApiError> {
    let topic = q
        .topic
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());
    let limit = q.limit.unwrap_or(20).clamp(1, 100);
    let rows = db::list_articles(&state.pool, topic.as_deref(), limit).await?;
    Ok(Json(rows))
}
