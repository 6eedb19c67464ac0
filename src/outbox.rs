use crate::company::{self, AnalyzeJob};
use crate::db::{self, OutboxJob};
use crate::dispatch::IngestJob;
use crate::ingest::run_ingest_pipeline;
use crate::model::OutboxKind;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

const ABANDONED_MESSAGE: &str = "analysis could not be completed";

#[instrument(skip_all)]
pub async fn process_next_task(
    state: &AppState,
    max_backoff_secs: i64,
    max_attempts: i32,
) -> Result<bool> {
    let Some(job) = db::next_due_outbox(&state.pool).await? else {
        return Ok(false);
    };
    let OutboxJob { id, attempt, .. } = job;
    let kind = job.kind.as_str();

    let Some(kind_enum) = OutboxKind::parse(kind) else {
        error!(id, kind, "unknown outbox kind; dropping");
        db::delete_outbox(&state.pool, id).await?;
        return Ok(true);
    };

    match run_job(state, kind_enum, &job.payload).await {
        Ok(()) => {
            db::delete_outbox(&state.pool, id).await?;
            info!(id, kind, "outbox task succeeded");
        }
        Err(err) if attempt + 1 >= max_attempts => {
            error!(?err, id, kind, attempt, "outbox task exhausted retries; dropping");
            if kind_enum == OutboxKind::AnalyzeCompany {
                abandon_analysis(state, &job.payload).await;
            }
            db::delete_outbox(&state.pool, id).await?;
        }
        Err(err) => {
            warn!(?err, id, kind, attempt, "outbox task failed; backoff");
            db::backoff_outbox_with_cap(&state.pool, id, attempt, max_backoff_secs).await?;
        }
    }
    Ok(true)
}

async fn run_job(state: &AppState, kind: OutboxKind, payload: &str) -> Result<()> {
    match kind {
        OutboxKind::IngestNews => {
            let job: IngestJob = serde_json::from_str(payload).context("bad ingest payload")?;
            let report = run_ingest_pipeline(
                &state.pool,
                &state.search,
                &job.topics,
                &job.batch_id,
                state.cfg.discover.max_articles_per_topic,
            )
            .await?;
            info!(
                batch_id = %report.batch_id,
                inserted = report.inserted,
                errors = report.errors.len(),
                "ingest batch finished"
            );
            Ok(())
        }
        OutboxKind::AnalyzeCompany => {
            let job: AnalyzeJob = serde_json::from_str(payload).context("bad analyze payload")?;
            company::run_analysis(state, job.context_id).await
        }
    }
}

/// Best effort: a dropped analysis must not leave its row mid-run.
async fn abandon_analysis(state: &AppState, payload: &str) {
    let job: AnalyzeJob = match serde_json::from_str(payload) {
        Ok(job) => job,
        Err(err) => {
            warn!(?err, "cannot read dropped analyze payload");
            return;
        }
    };
    match company::fail_analysis(state, job.context_id, ABANDONED_MESSAGE).await {
        Ok(()) => info!(context_id = job.context_id, "analysis marked failed"),
        Err(err) => error!(?err, context_id = job.context_id, "could not mark analysis failed"),
    }
}

/// Poll forever, one job at a time.
pub async fn run_worker(state: AppState) {
    let app = &state.cfg.app;
    let poll_sleep = Duration::from_millis(app.poll_interval_ms);
    let max_backoff = app.max_backoff_seconds as i64;
    let max_attempts = app.max_attempts;
    loop {
        match process_next_task(&state, max_backoff, max_attempts).await {
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(poll_sleep).await,
            Err(err) => {
                error!(?err, "outbox worker error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
