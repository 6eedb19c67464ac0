//! Upserts for data pushed by the browser extension.
use super::model::AnalyticsDay;
use super::Pool;
use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSync {
    pub public_identifier: String,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub follower_count: Option<i64>,
    pub connection_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostSync {
    pub activity_urn: String,
    pub text: Option<String>,
    pub posted_at: Option<String>,
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub reactions: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub reposts: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSync {
    /// `YYYY-MM-DD`
    pub day: String,
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub profile_views: i64,
    #[serde(default)]
    pub followers: i64,
}

#[instrument(skip_all)]
pub async fn upsert_profile(pool: &Pool, user_id: i64, p: &ProfileSync) -> Result<()> {
    sqlx::query(
        "INSERT INTO linkedin_profiles \
         (user_id, public_identifier, full_name, headline, follower_count, connection_count, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id) DO UPDATE SET \
           public_identifier = excluded.public_identifier, \
           full_name = COALESCE(excluded.full_name, full_name), \
           headline = COALESCE(excluded.headline, headline), \
           follower_count = COALESCE(excluded.follower_count, follower_count), \
           connection_count = COALESCE(excluded.connection_count, connection_count), \
           updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(&p.public_identifier)
    .bind(&p.full_name)
    .bind(&p.headline)
    .bind(p.follower_count)
    .bind(p.connection_count)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn upsert_linkedin_post(pool: &Pool, user_id: i64, p: &PostSync) -> Result<()> {
    sqlx::query(
        "INSERT INTO linkedin_posts \
         (user_id, activity_urn, text, posted_at, impressions, reactions, comments, reposts, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id, activity_urn) DO UPDATE SET \
           text = COALESCE(excluded.text, text), \
           posted_at = COALESCE(excluded.posted_at, posted_at), \
           impressions = excluded.impressions, \
           reactions = excluded.reactions, \
           comments = excluded.comments, \
           reposts = excluded.reposts, \
           updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(&p.activity_urn)
    .bind(&p.text)
    .bind(&p.posted_at)
    .bind(p.impressions)
    .bind(p.reactions)
    .bind(p.comments)
    .bind(p.reposts)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn upsert_analytics_day(pool: &Pool, user_id: i64, a: &AnalyticsSync) -> Result<()> {
    sqlx::query(
        "INSERT INTO analytics_daily (user_id, day, impressions, profile_views, followers, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id, day) DO UPDATE SET \
           impressions = excluded.impressions, \
           profile_views = excluded.profile_views, \
           followers = excluded.followers, \
           updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(&a.day)
    .bind(a.impressions)
    .bind(a.profile_views)
    .bind(a.followers)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn latest_analytics_day(pool: &Pool, user_id: i64) -> Result<Option<AnalyticsDay>> {
    let row = sqlx::query_as::<_, AnalyticsDay>(
        "SELECT day, impressions, profile_views, followers FROM analytics_daily \
         WHERE user_id = ? ORDER BY day DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
