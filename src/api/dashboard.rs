use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use super::auth::AuthUser;
use crate::company::{self, StatusView};
use crate::db::{self, AnalyticsDay, BrandKit};
use crate::error::ApiError;
use crate::state::AppState;

/// Each section is `null` when its read failed.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub pending_posts: Option<i64>,
    pub wishlist_count: Option<i64>,
    pub active_brand_kit: Option<BrandKit>,
    pub company_status: Option<StatusView>,
    pub latest_analytics: Option<AnalyticsDay>,
}

/// A missing table reads as an empty section; other failures as `None`.
fn settle<T: Default>(section: &'static str, res: anyhow::Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(err) if db::is_missing_table(&err) => Some(T::default()),
        Err(err) => {
            warn!(?err, section, "dashboard section failed");
            None
        }
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Dashboard>, ApiError> {
    let pool = &state.pool;
    let (posts, wishlist, kit, status, analytics) = tokio::join!(
        db::count_pending_posts(pool, user_id),
        db::count_wishlist(pool, user_id),
        db::active_brand_kit(pool, user_id),
        company::status_for_user(&state, user_id),
        db::latest_analytics_day(pool, user_id),
    );
    Ok(Json(Dashboard {
        pending_posts: settle("pending_posts", posts),
        wishlist_count: settle("wishlist_count", wishlist),
        active_brand_kit: settle("active_brand_kit", kit).flatten(),
        company_status: settle("company_status", status),
        latest_analytics: settle("latest_analytics", analytics).flatten(),
    }))
}
