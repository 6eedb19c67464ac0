//! Database rows returned by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CompanyContext {
    pub id: i64,
    pub user_id: i64,
    pub company_name: String,
    pub website_url: String,
    pub status: String,
    pub error_message: Option<String>,
    pub website_summary: Option<String>,
    pub research_summary: Option<String>,
    #[serde(skip_serializing)]
    pub analysis_json: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NewsArticle {
    pub id: i64,
    pub topic: String,
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source_name: Option<String>,
    pub published_at: Option<String>,
    pub batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WishlistItem {
    pub id: i64,
    pub content: String,
    pub author_name: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BrandKit {
    pub id: i64,
    pub name: String,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub font_family: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored BYOK row. `encrypted_key` never leaves the service.
#[derive(Debug, Clone, FromRow)]
pub struct StoredApiKey {
    pub provider: String,
    pub encrypted_key: String,
    pub key_hint: String,
    pub is_valid: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ScheduledPost {
    pub id: i64,
    pub content: String,
    pub scheduled_for: DateTime<Utc>,
    pub visibility: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PromptVersion {
    pub id: i64,
    pub name: String,
    pub version: i64,
    pub content: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnalyticsDay {
    pub day: String,
    pub impressions: i64,
    pub profile_views: i64,
    pub followers: i64,
}

/// A due outbox job handed to the worker.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxJob {
    pub id: i64,
    pub kind: String,
    pub payload: String,
    pub attempt: i32,
}
