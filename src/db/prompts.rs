use super::model::PromptVersion;
use super::Pool;
use anyhow::Result;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::instrument;

const COLUMNS: &str = "id, name, version, content, note, created_at";

/// Append a new version of `name`. History is never rewritten.
#[instrument(skip_all)]
pub async fn append_prompt_version(
    pool: &Pool,
    name: &str,
    content: &str,
    note: Option<&str>,
) -> Result<PromptVersion> {
    let mut tx = pool.begin().await?;
    let row = append_tx(&mut tx, name, content, note).await?;
    tx.commit().await?;
    Ok(row)
}

async fn append_tx(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    content: &str,
    note: Option<&str>,
) -> Result<PromptVersion> {
    let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) + 1 FROM prompts WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    let row = sqlx::query_as::<_, PromptVersion>(&format!(
        "INSERT INTO prompts (name, version, content, note, created_at) VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(name)
    .bind(next)
    .bind(content)
    .bind(note)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn latest_prompt(pool: &Pool, name: &str) -> Result<Option<PromptVersion>> {
    let row = sqlx::query_as::<_, PromptVersion>(&format!(
        "SELECT {COLUMNS} FROM prompts WHERE name = ? ORDER BY version DESC LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn prompt_versions(pool: &Pool, name: &str) -> Result<Vec<PromptVersion>> {
    let rows = sqlx::query_as::<_, PromptVersion>(&format!(
        "SELECT {COLUMNS} FROM prompts WHERE name = ? ORDER BY version DESC"
    ))
    .bind(name)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Roll back by appending a copy of `version` as the newest version.
/// Returns None when the target version does not exist.
#[instrument(skip_all)]
pub async fn rollback_prompt(pool: &Pool, name: &str, version: i64) -> Result<Option<PromptVersion>> {
    let mut tx = pool.begin().await?;
    let target = sqlx::query_scalar::<_, String>("SELECT content FROM prompts WHERE name = ? AND version = ?")
        .bind(name)
        .bind(version)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(content) = target else {
        return Ok(None);
    };
    let note = format!("rollback to v{version}");
    let row = append_tx(&mut tx, name, &content, Some(&note)).await?;
    tx.commit().await?;
    Ok(Some(row))
}
