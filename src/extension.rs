//! Applies typed sync messages from the browser extension.
use anyhow::Result;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{self, AnalyticsSync, Pool, PostSync, ProfileSync};
use crate::model::SyncType;

const MAX_ENTRIES: usize = 500;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncResult {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: SyncType,
    pub upserted: usize,
    pub errors: Vec<String>,
}

fn entries(data: Value) -> Result<Vec<Value>, SyncError> {
    match data {
        Value::Array(items) if items.len() <= MAX_ENTRIES => Ok(items),
        Value::Array(_) => Err(SyncError::Invalid(format!("at most {MAX_ENTRIES} entries per sync"))),
        _ => Err(SyncError::Invalid("data must be an array".into())),
    }
}

fn decode<T: DeserializeOwned>(i: usize, v: Value) -> Result<T, String> {
    serde_json::from_value(v).map_err(|e| format!("entry {i}: {e}"))
}

#[instrument(skip_all, fields(user_id = user_id, kind = ?kind))]
pub async fn apply_sync(
    pool: &Pool,
    user_id: i64,
    kind: SyncType,
    data: Value,
) -> Result<SyncResult, SyncError> {
    let mut upserted = 0;
    let mut errors = Vec::new();

    match kind {
        SyncType::Profile => {
            let profile: ProfileSync = serde_json::from_value(data)
                .map_err(|e| SyncError::Invalid(format!("invalid profile: {e}")))?;
            if profile.public_identifier.trim().is_empty() {
                return Err(SyncError::Invalid("public_identifier is required".into()));
            }
            db::upsert_profile(pool, user_id, &profile).await?;
            upserted = 1;
        }
        SyncType::Posts => {
            for (i, v) in entries(data)?.into_iter().enumerate() {
                match decode::<PostSync>(i, v) {
                    Ok(p) if p.activity_urn.trim().is_empty() => {
                        errors.push(format!("entry {i}: activity_urn is required"))
                    }
                    Ok(p) => {
                        db::upsert_linkedin_post(pool, user_id, &p).await?;
                        upserted += 1;
                    }
                    Err(e) => errors.push(e),
                }
            }
        }
        SyncType::Analytics => {
            for (i, v) in entries(data)?.into_iter().enumerate() {
                match decode::<AnalyticsSync>(i, v) {
                    Ok(a) if NaiveDate::parse_from_str(&a.day, "%Y-%m-%d").is_err() => {
                        errors.push(format!("entry {i}: day must be YYYY-MM-DD"))
                    }
                    Ok(a) => {
                        db::upsert_analytics_day(pool, user_id, &a).await?;
                        upserted += 1;
                    }
                    Err(e) => errors.push(e),
                }
            }
        }
    }

    info!(upserted, rejected = errors.len(), "extension sync applied");
    Ok(SyncResult {
        success: errors.is_empty(),
        kind,
        upserted,
        errors,
    })
}
