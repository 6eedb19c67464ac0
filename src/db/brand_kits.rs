use super::model::BrandKit;
use super::Pool;
use anyhow::Result;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::instrument;

const COLUMNS: &str = "id, name, primary_color, secondary_color, font_family, logo_url, \
     is_active, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct NewBrandKit {
    pub name: String,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub font_family: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: bool,
}

/// Insert a kit. When it is active, the user's other kits are deactivated in
/// the same transaction; the partial unique index rejects any interleaving
/// that would leave two active kits.
#[instrument(skip_all)]
pub async fn create_brand_kit(pool: &Pool, user_id: i64, kit: &NewBrandKit) -> Result<BrandKit> {
    let mut tx = pool.begin().await?;
    if kit.is_active {
        deactivate_all_tx(&mut tx, user_id, None).await?;
    }
    let now = Utc::now();
    let row = sqlx::query_as::<_, BrandKit>(&format!(
        "INSERT INTO brand_kits \
         (user_id, name, primary_color, secondary_color, font_family, logo_url, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(user_id)
    .bind(&kit.name)
    .bind(&kit.primary_color)
    .bind(&kit.secondary_color)
    .bind(&kit.font_family)
    .bind(&kit.logo_url)
    .bind(kit.is_active)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(row)
}

/// Make `kit_id` the only active kit. Returns None when the user owns no such kit.
#[instrument(skip_all)]
pub async fn activate_brand_kit(pool: &Pool, user_id: i64, kit_id: i64) -> Result<Option<BrandKit>> {
    let mut tx = pool.begin().await?;
    let owned = sqlx::query_scalar::<_, i64>("SELECT id FROM brand_kits WHERE id = ? AND user_id = ?")
        .bind(kit_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if owned.is_none() {
        return Ok(None);
    }
    deactivate_all_tx(&mut tx, user_id, Some(kit_id)).await?;
    let row = sqlx::query_as::<_, BrandKit>(&format!(
        "UPDATE brand_kits SET is_active = 1, updated_at = ? WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(Utc::now())
    .bind(kit_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some(row))
}

async fn deactivate_all_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    except: Option<i64>,
) -> Result<()> {
    sqlx::query(
        "UPDATE brand_kits SET is_active = 0, updated_at = ? \
         WHERE user_id = ? AND is_active = 1 AND (? IS NULL OR id != ?)",
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(except)
    .bind(except)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn list_brand_kits(pool: &Pool, user_id: i64) -> Result<Vec<BrandKit>> {
    let rows = sqlx::query_as::<_, BrandKit>(&format!(
        "SELECT {COLUMNS} FROM brand_kits WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn active_brand_kit(pool: &Pool, user_id: i64) -> Result<Option<BrandKit>> {
    let row = sqlx::query_as::<_, BrandKit>(&format!(
        "SELECT {COLUMNS} FROM brand_kits WHERE user_id = ? AND is_active = 1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[instrument(skip_all)]
pub async fn delete_brand_kit(pool: &Pool, user_id: i64, kit_id: i64) -> Result<bool> {
    let res = sqlx::query("DELETE FROM brand_kits WHERE id = ? AND user_id = ?")
        .bind(kit_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}
