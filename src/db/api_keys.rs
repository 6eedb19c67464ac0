use super::model::StoredApiKey;
use super::Pool;
use crate::model::KeyProvider;
use anyhow::Result;
use chrono::Utc;
use tracing::instrument;

/// Store (or replace) a user's encrypted key; the validity flag resets to true.
#[instrument(skip_all)]
pub async fn upsert_api_key(
    pool: &Pool,
    user_id: i64,
    provider: KeyProvider,
    encrypted_key: &str,
    key_hint: &str,
) -> Result<()> {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO user_api_keys (user_id, provider, encrypted_key, key_hint, is_valid, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 1, ?, ?) \
         ON CONFLICT(user_id, provider) DO UPDATE SET \
           encrypted_key = excluded.encrypted_key, \
           key_hint = excluded.key_hint, \
           is_valid = 1, \
           updated_at = excluded.updated_at",
    )
    .bind(user_id)
    .bind(provider.as_str())
    .bind(encrypted_key)
    .bind(key_hint)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn list_api_keys(pool: &Pool, user_id: i64) -> Result<Vec<StoredApiKey>> {
    let rows = sqlx::query_as::<_, StoredApiKey>(
        "SELECT provider, encrypted_key, key_hint, is_valid, updated_at FROM user_api_keys \
         WHERE user_id = ? ORDER BY provider",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The user's key for `provider` if one is stored and still flagged valid.
#[instrument(skip_all)]
pub async fn valid_api_key(
    pool: &Pool,
    user_id: i64,
    provider: KeyProvider,
) -> Result<Option<StoredApiKey>> {
    let row = sqlx::query_as::<_, StoredApiKey>(
        "SELECT provider, encrypted_key, key_hint, is_valid, updated_at FROM user_api_keys \
         WHERE user_id = ? AND provider = ? AND is_valid = 1",
    )
    .bind(user_id)
    .bind(provider.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn mark_api_key_invalid(pool: &Pool, user_id: i64, provider: KeyProvider) -> Result<()> {
    sqlx::query(
        "UPDATE user_api_keys SET is_valid = 0, updated_at = ? WHERE user_id = ? AND provider = ?",
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(provider.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn delete_api_key(pool: &Pool, user_id: i64, provider: KeyProvider) -> Result<bool> {
    let res = sqlx::query("DELETE FROM user_api_keys WHERE user_id = ? AND provider = ?")
        .bind(user_id)
        .bind(provider.as_str())
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_or_create_user, memory_pool};

    #[tokio::test]
    async fn invalid_keys_are_hidden_until_replaced() {
        let pool = memory_pool().await.unwrap();
        let uid = get_or_create_user(&pool, "k@example.com", None).await.unwrap();
        upsert_api_key(&pool, uid, KeyProvider::Openrouter, "enc-1", "sk-…1234")
            .await
            .unwrap();
        assert!(valid_api_key(&pool, uid, KeyProvider::Openrouter)
            .await
            .unwrap()
            .is_some());

        mark_api_key_invalid(&pool, uid, KeyProvider::Openrouter).await.unwrap();
        assert!(valid_api_key(&pool, uid, KeyProvider::Openrouter)
            .await
            .unwrap()
            .is_none());
        let listed = list_api_keys(&pool, uid).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_valid);

        upsert_api_key(&pool, uid, KeyProvider::Openrouter, "enc-2", "sk-…5678")
            .await
            .unwrap();
        let key = valid_api_key(&pool, uid, KeyProvider::Openrouter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key.encrypted_key, "enc-2");
        assert!(delete_api_key(&pool, uid, KeyProvider::Openrouter).await.unwrap());
        assert!(!delete_api_key(&pool, uid, KeyProvider::Openrouter).await.unwrap());
    }
}
