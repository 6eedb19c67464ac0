//! Discover/news ingestion: search each topic, normalize, store new articles.
use crate::db::{self, Pool};
use crate::search::{normalize_article, SearchChain};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    pub batch_id: String,
    pub topics_processed: usize,
    pub inserted: usize,
    /// Rejected as malformed or already stored.
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Run the pipeline for `topics` in order. Provider failures are recorded per
/// topic and do not stop the run; database failures do.
#[instrument(skip_all, fields(batch_id = %batch_id, topics = topics.len()))]
pub async fn run_ingest_pipeline(
    pool: &Pool,
    search: &SearchChain,
    topics: &[String],
    batch_id: &str,
    max_per_topic: usize,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        batch_id: batch_id.to_string(),
        ..Default::default()
    };

    for topic in topics {
        report.topics_processed += 1;
        let raw = match search.search_news(topic, max_per_topic).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(topic, %err, "no provider could search topic");
                report.errors.push(format!("{topic}: {err}"));
                continue;
            }
        };

        let mut added = 0;
        for item in raw.iter().take(max_per_topic) {
            let Some(article) = normalize_article(topic, item) else {
                report.skipped += 1;
                continue;
            };
            if db::insert_article(pool, &article, batch_id).await? {
                added += 1;
            } else {
                report.skipped += 1;
            }
        }
        info!(topic, added, "topic ingested");
        report.inserted += added;
    }

    Ok(report)
}
