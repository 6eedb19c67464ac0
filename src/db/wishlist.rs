use super::model::WishlistItem;
use super::Pool;
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::instrument;

/// Insert a swipe-file entry. A duplicate `(user_id, content)` surfaces as a
/// unique violation; see [`super::is_unique_violation`].
#[instrument(skip_all)]
pub async fn insert_wishlist_item(
    pool: &Pool,
    user_id: i64,
    content: &str,
    author_name: Option<&str>,
    source_url: Option<&str>,
) -> Result<WishlistItem> {
    let item = sqlx::query_as::<_, WishlistItem>(
        "INSERT INTO swipe_wishlist (user_id, content, author_name, source_url, created_at) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id, content, author_name, source_url, created_at",
    )
    .bind(user_id)
    .bind(content)
    .bind(author_name)
    .bind(source_url)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("insert wishlist item")?;
    Ok(item)
}

#[instrument(skip_all)]
pub async fn list_wishlist(pool: &Pool, user_id: i64) -> Result<Vec<WishlistItem>> {
    let rows = sqlx::query_as::<_, WishlistItem>(
        "SELECT id, content, author_name, source_url, created_at FROM swipe_wishlist \
         WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn count_wishlist(pool: &Pool, user_id: i64) -> Result<i64> {
    let cnt = sqlx::query_scalar("SELECT COUNT(*) FROM swipe_wishlist WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(cnt)
}

/// Returns false when the item does not exist or belongs to someone else.
#[instrument(skip_all)]
pub async fn delete_wishlist_item(pool: &Pool, user_id: i64, id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM swipe_wishlist WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}
