use super::model::ScheduledPost;
use super::Pool;
use crate::model::{PostStatus, Visibility};
use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::instrument;

const COLUMNS: &str = "id, content, scheduled_for, visibility, status, created_at, updated_at";

#[instrument(skip_all)]
pub async fn insert_scheduled_post(
    pool: &Pool,
    user_id: i64,
    content: &str,
    scheduled_for: DateTime<Utc>,
    visibility: Visibility,
) -> Result<ScheduledPost> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, ScheduledPost>(&format!(
        "INSERT INTO scheduled_posts (user_id, content, scheduled_for, visibility, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(user_id)
    .bind(content)
    .bind(scheduled_for)
    .bind(visibility.as_str())
    .bind(PostStatus::Pending.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn list_scheduled_posts(pool: &Pool, user_id: i64) -> Result<Vec<ScheduledPost>> {
    let rows = sqlx::query_as::<_, ScheduledPost>(&format!(
        "SELECT {COLUMNS} FROM scheduled_posts WHERE user_id = ? ORDER BY scheduled_for ASC, id ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn count_pending_posts(pool: &Pool, user_id: i64) -> Result<i64> {
    let cnt = sqlx::query_scalar("SELECT COUNT(*) FROM scheduled_posts WHERE user_id = ? AND status = ?")
        .bind(user_id)
        .bind(PostStatus::Pending.as_str())
        .fetch_one(pool)
        .await?;
    Ok(cnt)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(Box<ScheduledPost>),
    NotFound,
    /// The post already left `pending`; carries its current status.
    NotPending(String),
}

/// Move a pending post to `cancelled`. The status guard lives in the UPDATE so a
/// concurrent publish cannot be overwritten.
#[instrument(skip_all)]
pub async fn cancel_scheduled_post(pool: &Pool, user_id: i64, id: i64) -> Result<CancelOutcome> {
    let updated = sqlx::query_as::<_, ScheduledPost>(&format!(
        "UPDATE scheduled_posts SET status = ?, updated_at = ? \
         WHERE id = ? AND user_id = ? AND status = ? RETURNING {COLUMNS}"
    ))
    .bind(PostStatus::Cancelled.as_str())
    .bind(Utc::now())
    .bind(id)
    .bind(user_id)
    .bind(PostStatus::Pending.as_str())
    .fetch_optional(pool)
    .await?;
    if let Some(post) = updated {
        return Ok(CancelOutcome::Cancelled(Box::new(post)));
    }

    let status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM scheduled_posts WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(match status {
        Some(status) => CancelOutcome::NotPending(status),
        None => CancelOutcome::NotFound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_or_create_user, memory_pool};
    use chrono::Duration;

    #[tokio::test]
    async fn cancel_only_from_pending() {
        let pool = memory_pool().await.unwrap();
        let uid = get_or_create_user(&pool, "p@example.com", None).await.unwrap();
        let post = insert_scheduled_post(
            &pool,
            uid,
            "hello",
            Utc::now() + Duration::hours(2),
            Visibility::Anyone,
        )
        .await
        .unwrap();
        assert_eq!(count_pending_posts(&pool, uid).await.unwrap(), 1);

        match cancel_scheduled_post(&pool, uid, post.id).await.unwrap() {
            CancelOutcome::Cancelled(p) => assert_eq!(p.status, "cancelled"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            cancel_scheduled_post(&pool, uid, post.id).await.unwrap(),
            CancelOutcome::NotPending("cancelled".into())
        );
        assert_eq!(
            cancel_scheduled_post(&pool, uid, post.id + 100).await.unwrap(),
            CancelOutcome::NotFound
        );
        assert_eq!(count_pending_posts(&pool, uid).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_is_ordered_by_schedule() {
        let pool = memory_pool().await.unwrap();
        let uid = get_or_create_user(&pool, "o@example.com", None).await.unwrap();
        let later = Utc::now() + Duration::days(2);
        let sooner = Utc::now() + Duration::days(1);
        insert_scheduled_post(&pool, uid, "later", later, Visibility::Anyone)
            .await
            .unwrap();
        insert_scheduled_post(&pool, uid, "sooner", sooner, Visibility::Connections)
            .await
            .unwrap();
        let posts = list_scheduled_posts(&pool, uid).await.unwrap();
        assert_eq!(posts[0].content, "sooner");
        assert_eq!(posts[0].visibility, "connections");
    }
}
