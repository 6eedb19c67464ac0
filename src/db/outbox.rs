use super::model::OutboxJob;
use super::Pool;
use crate::model::OutboxKind;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use tracing::instrument;

#[instrument(skip_all)]
pub async fn enqueue_outbox(
    pool: &Pool,
    kind: OutboxKind,
    payload: &serde_json::Value,
    due_at: DateTime<Utc>,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO outbox (kind, payload, attempt, due_at, created_at) VALUES (?, ?, 0, ?, ?) RETURNING id",
    )
    .bind(kind.as_str())
    .bind(payload.to_string())
    .bind(due_at)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

#[instrument(skip_all)]
pub async fn next_due_outbox(pool: &Pool) -> Result<Option<OutboxJob>> {
    let job = sqlx::query_as::<_, OutboxJob>(
        "SELECT id, kind, payload, attempt FROM outbox WHERE due_at <= ? ORDER BY due_at ASC, id ASC LIMIT 1",
    )
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;
    Ok(job)
}

#[instrument(skip_all)]
pub async fn count_outbox(pool: &Pool) -> Result<i64> {
    let cnt = sqlx::query_scalar("SELECT COUNT(*) FROM outbox")
        .fetch_one(pool)
        .await?;
    Ok(cnt)
}

#[instrument(skip_all)]
pub async fn delete_outbox(pool: &Pool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM outbox WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delay before retry number `attempt + 1`: 5s * 2^attempt, capped.
/// A non-positive cap disables capping.
pub fn backoff_delay_secs(attempt: i32, max_cap_secs: i64) -> i64 {
    let secs = 5_i64 * (1_i64 << attempt.clamp(0, 10));
    if max_cap_secs <= 0 {
        secs
    } else {
        secs.min(max_cap_secs)
    }
}

#[instrument(skip_all)]
pub async fn backoff_outbox_with_cap(
    pool: &Pool,
    id: i64,
    attempt: i32,
    max_cap_secs: i64,
) -> Result<()> {
    let secs = backoff_delay_secs(attempt, max_cap_secs);
    sqlx::query("UPDATE outbox SET attempt = ?, due_at = ? WHERE id = ?")
        .bind(attempt + 1)
        .bind(Utc::now() + Duration::seconds(secs))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
