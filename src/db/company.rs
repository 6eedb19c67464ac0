use super::model::CompanyContext;
use super::Pool;
use crate::model::AnalysisStatus;
use anyhow::Result;
use chrono::Utc;
use sqlx::Row;
use tracing::instrument;

const COLUMNS: &str = "id, user_id, company_name, website_url, status, error_message, \
     website_summary, research_summary, analysis_json, created_at, updated_at";

/// Create or reset the user's company context to `pending`. Previous results are cleared.
#[instrument(skip_all)]
pub async fn upsert_company_context(
    pool: &Pool,
    user_id: i64,
    company_name: &str,
    website_url: &str,
) -> Result<i64> {
    let now = Utc::now();
    let rec = sqlx::query(
        "INSERT INTO company_context (user_id, company_name, website_url, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id) DO UPDATE SET \
           company_name = excluded.company_name, \
           website_url = excluded.website_url, \
           status = excluded.status, \
           error_message = NULL, \
           website_summary = NULL, \
           research_summary = NULL, \
           analysis_json = NULL, \
           updated_at = excluded.updated_at \
         RETURNING id",
    )
    .bind(user_id)
    .bind(company_name)
    .bind(website_url)
    .bind(AnalysisStatus::Pending.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

#[instrument(skip_all)]
pub async fn company_context_for_user(pool: &Pool, user_id: i64) -> Result<Option<CompanyContext>> {
    let row = sqlx::query_as::<_, CompanyContext>(&format!(
        "SELECT {COLUMNS} FROM company_context WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn company_context_by_id(pool: &Pool, id: i64) -> Result<Option<CompanyContext>> {
    let row = sqlx::query_as::<_, CompanyContext>(&format!(
        "SELECT {COLUMNS} FROM company_context WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Only the status column, for the polling endpoint.
#[instrument(skip_all)]
pub async fn company_status_for_user(
    pool: &Pool,
    user_id: i64,
) -> Result<Option<(String, Option<String>)>> {
    let row = sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT status, error_message FROM company_context WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn set_company_status(
    pool: &Pool,
    id: i64,
    status: AnalysisStatus,
    error_message: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE company_context SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(error_message)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn set_website_summary(pool: &Pool, id: i64, summary: &str) -> Result<()> {
    sqlx::query("UPDATE company_context SET website_summary = ?, updated_at = ? WHERE id = ?")
        .bind(summary)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn set_research_summary(pool: &Pool, id: i64, summary: &str) -> Result<()> {
    sqlx::query("UPDATE company_context SET research_summary = ?, updated_at = ? WHERE id = ?")
        .bind(summary)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn complete_company_analysis(pool: &Pool, id: i64, analysis_json: &str) -> Result<()> {
    sqlx::query(
        "UPDATE company_context SET status = ?, analysis_json = ?, error_message = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(AnalysisStatus::Completed.as_str())
    .bind(analysis_json)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_or_create_user, memory_pool};

    #[tokio::test]
    async fn reanalysis_resets_previous_results() {
        let pool = memory_pool().await.unwrap();
        let uid = get_or_create_user(&pool, "c@example.com", None).await.unwrap();
        let id = upsert_company_context(&pool, uid, "Acme", "https://acme.test")
            .await
            .unwrap();
        complete_company_analysis(&pool, id, r#"{"industry":"tools"}"#)
            .await
            .unwrap();

        let again = upsert_company_context(&pool, uid, "Acme Corp", "https://acme.test")
            .await
            .unwrap();
        assert_eq!(id, again);
        let row = company_context_for_user(&pool, uid).await.unwrap().unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(row.company_name, "Acme Corp");
        assert!(row.analysis_json.is_none());
    }

    #[tokio::test]
    async fn status_updates_are_visible() {
        let pool = memory_pool().await.unwrap();
        let uid = get_or_create_user(&pool, "d@example.com", None).await.unwrap();
        assert!(company_status_for_user(&pool, uid).await.unwrap().is_none());
        let id = upsert_company_context(&pool, uid, "Acme", "https://acme.test")
            .await
            .unwrap();
        set_company_status(&pool, id, AnalysisStatus::Failed, Some("boom"))
            .await
            .unwrap();
        let (status, err) = company_status_for_user(&pool, uid).await.unwrap().unwrap();
        assert_eq!(status, "failed");
        assert_eq!(err.as_deref(), Some("boom"));
    }
}
