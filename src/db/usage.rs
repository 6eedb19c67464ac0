use super::Pool;
use anyhow::Result;
use chrono::Utc;
use tracing::instrument;

/// One AI call, successful or not.
#[derive(Debug, Clone, Default)]
pub struct UsageRecord<'a> {
    pub user_id: Option<i64>,
    pub feature: &'a str,
    pub model: &'a str,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub latency_ms: i64,
    pub success: bool,
}

#[instrument(skip_all)]
pub async fn record_ai_usage(pool: &Pool, rec: &UsageRecord<'_>) -> Result<()> {
    sqlx::query(
        "INSERT INTO ai_usage (user_id, feature, model, prompt_tokens, completion_tokens, latency_ms, success, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(rec.user_id)
    .bind(rec.feature)
    .bind(rec.model)
    .bind(rec.prompt_tokens)
    .bind(rec.completion_tokens)
    .bind(rec.latency_ms)
    .bind(rec.success)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}
