use super::model::NewsArticle;
use super::Pool;
use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::instrument;

/// Normalized article ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub topic: String,
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source_name: Option<String>,
    pub published_at: Option<String>,
}

impl NewArticle {
    /// Dedup key: the URL without fragment or trailing slash, or `topic::title`
    /// when the provider gave no URL. Only scheme and host are case-folded.
    pub fn natural_key(&self) -> String {
        match &self.url {
            Some(raw) => {
                let url = match reqwest::Url::parse(raw) {
                    Ok(mut url) => {
                        url.set_fragment(None);
                        url.to_string()
                    }
                    Err(_) => raw.split('#').next().unwrap_or(raw).to_string(),
                };
                url.trim_end_matches('/').to_string()
            }
            None => format!("{}::{}", self.topic, self.title.to_lowercase()),
        }
    }
}

/// Insert unless the natural key is already present. Returns whether a row was added.
#[instrument(skip_all)]
pub async fn insert_article(pool: &Pool, article: &NewArticle, batch_id: &str) -> Result<bool> {
    let res = sqlx::query(
        "INSERT INTO discover_news_articles \
         (topic, title, summary, url, source_name, published_at, natural_key, batch_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(natural_key) DO NOTHING",
    )
    .bind(&article.topic)
    .bind(&article.title)
    .bind(&article.summary)
    .bind(&article.url)
    .bind(&article.source_name)
    .bind(&article.published_at)
    .bind(article.natural_key())
    .bind(batch_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Whether `topic` already has articles created at or after `since`.
#[instrument(skip_all)]
pub async fn topic_has_recent_articles(
    pool: &Pool,
    topic: &str,
    since: DateTime<Utc>,
) -> Result<bool> {
    let cnt: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM discover_news_articles WHERE topic = ? AND created_at >= ?",
    )
    .bind(topic)
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(cnt > 0)
}

#[instrument(skip_all)]
pub async fn list_articles(
    pool: &Pool,
    topic: Option<&str>,
    limit: i64,
) -> Result<Vec<NewsArticle>> {
    let rows = sqlx::query_as::<_, NewsArticle>(
        "SELECT id, topic, title, summary, url, source_name, published_at, batch_id, created_at \
         FROM discover_news_articles \
         WHERE (?1 IS NULL OR topic = ?1) \
         ORDER BY created_at DESC, id DESC LIMIT ?2",
    )
    .bind(topic)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
