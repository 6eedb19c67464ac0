//! Callback endpoint that Inngest invokes to run a dispatched batch.
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::auth::bearer_token;
use crate::dispatch::{IngestJob, INGEST_EVENT};
use crate::error::ApiError;
use crate::ingest::{run_ingest_pipeline, IngestReport};
use crate::seed::normalize_topics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InngestEvent {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

fn same_secret(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestReport>, ApiError> {
    let expected = state
        .secrets
        .inngest_signing_key
        .as_deref()
        .ok_or(ApiError::Unauthorized)?;
    match bearer_token(&headers) {
        Some(token) if same_secret(token, expected) => {}
        _ => {
            warn!("inngest callback with bad signing key");
            return Err(ApiError::Unauthorized);
        }
    }

    let event: InngestEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid event: {e}")))?;
    if event.name != INGEST_EVENT {
        return Err(ApiError::bad_request(format!("unsupported event {}", event.name)));
    }
    let job: IngestJob = serde_json::from_value(event.data)
        .map_err(|e| ApiError::bad_request(format!("invalid event data: {e}")))?;
    let topics = normalize_topics(&job.topics)?;

    let report = run_ingest_pipeline(
        &state.pool,
        &state.search,
        &topics,
        &job.batch_id,
        state.cfg.discover.max_articles_per_topic,
    )
    .await?;
    info!(batch_id = %report.batch_id, inserted = report.inserted, "inngest batch finished");
    Ok(Json(report))
}
