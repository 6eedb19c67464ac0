//! Seed trigger for discover/news ingestion.
//!
//! Gates run in a fixed order: provider key, then recent-data dedup, then
//! dispatch; only when dispatch fails does the pipeline outcome decide the
//! result.
use chrono::{Duration, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::dispatch::{Dispatcher, IngestJob};
use crate::ingest::run_ingest_pipeline;
use crate::model::SeedReason;
use crate::search::SearchChain;

pub const MAX_TOPICS: usize = 20;
pub const MAX_TOPIC_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("{0}")]
    InvalidTopics(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRequest {
    pub topics: Vec<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeedOutcome {
    pub seeded: bool,
    pub reason: SeedReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<usize>,
}

impl SeedOutcome {
    fn bare(reason: SeedReason) -> Self {
        Self {
            seeded: reason.seeded(),
            reason,
            batch_id: None,
            topics: Vec::new(),
            articles: None,
        }
    }
}

/// Everything the trigger needs, borrowed from the caller's state.
pub struct Seeder<'a> {
    pub pool: &'a Pool,
    pub search: &'a SearchChain,
    pub dispatcher: &'a dyn Dispatcher,
    pub dedup_window_hours: i64,
    pub max_articles_per_topic: usize,
}

/// Trim, lowercase and de-duplicate topics, keeping first-seen order.
pub fn normalize_topics(raw: &[String]) -> Result<Vec<String>, SeedError> {
    let mut out: Vec<String> = Vec::new();
    for t in raw {
        let t = t.trim().to_lowercase();
        if t.is_empty() {
            continue;
        }
        if t.chars().count() > MAX_TOPIC_LEN {
            return Err(SeedError::InvalidTopics("topic is too long"));
        }
        if !out.contains(&t) {
            out.push(t);
        }
    }
    if out.is_empty() {
        return Err(SeedError::InvalidTopics("at least one topic is required"));
    }
    if out.len() > MAX_TOPICS {
        return Err(SeedError::InvalidTopics("too many topics"));
    }
    Ok(out)
}

impl Seeder<'_> {
    #[instrument(skip_all, fields(force = req.force))]
    pub async fn seed(&self, req: &SeedRequest) -> Result<SeedOutcome, SeedError> {
        let topics = normalize_topics(&req.topics)?;

        if self.search.is_empty() {
            info!("seed skipped: no search provider key configured");
            return Ok(SeedOutcome::bare(SeedReason::NoApiKey));
        }

        let topics = if req.force {
            topics
        } else {
            self.fresh_topics(topics).await?
        };
        if topics.is_empty() {
            info!("seed skipped: all topics have recent articles");
            return Ok(SeedOutcome::bare(SeedReason::AlreadyExists));
        }

        let job = IngestJob {
            batch_id: Uuid::new_v4().to_string(),
            topics,
        };

        match self.dispatcher.dispatch_ingest(&job).await {
            Ok(()) => {
                info!(batch_id = %job.batch_id, dispatcher = self.dispatcher.name(), "seed dispatched");
                return Ok(SeedOutcome {
                    seeded: true,
                    reason: SeedReason::Triggered,
                    batch_id: Some(job.batch_id),
                    topics: job.topics,
                    articles: None,
                });
            }
            Err(err) => {
                warn!(
                    ?err,
                    dispatcher = self.dispatcher.name(),
                    "dispatch failed; running ingest pipeline inline"
                );
            }
        }

        let report = run_ingest_pipeline(
            self.pool,
            self.search,
            &job.topics,
            &job.batch_id,
            self.max_articles_per_topic,
        )
        .await?;
        let reason = if report.inserted > 0 {
            SeedReason::Success
        } else {
            SeedReason::NoResults
        };
        Ok(SeedOutcome {
            seeded: reason.seeded(),
            reason,
            batch_id: Some(job.batch_id),
            topics: job.topics,
            articles: Some(report.inserted),
        })
    }

    /// Topics without articles inside the dedup window.
    async fn fresh_topics(&self, topics: Vec<String>) -> anyhow::Result<Vec<String>> {
        let since = Utc::now() - Duration::hours(self.dedup_window_hours);
        let recent = try_join_all(
            topics
                .iter()
                .map(|t| db::topic_has_recent_articles(self.pool, t, since)),
        )
        .await?;
        Ok(topics
            .into_iter()
            .zip(recent)
            .filter_map(|(t, has_recent)| (!has_recent).then_some(t))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_dedups_and_lowercases() {
        let got = normalize_topics(&topics(&[" AI ", "ai", "", "SaaS"])).unwrap();
        assert_eq!(got, vec!["ai", "saas"]);
    }

    #[test]
    fn normalize_rejects_empty_and_oversized() {
        assert!(matches!(
            normalize_topics(&topics(&["  "])),
            Err(SeedError::InvalidTopics(_))
        ));
        let long = "x".repeat(MAX_TOPIC_LEN + 1);
        assert!(normalize_topics(&[long]).is_err());
        let many: Vec<String> = (0..=MAX_TOPICS).map(|i| format!("t{i}")).collect();
        assert!(normalize_topics(&many).is_err());
    }

    #[test]
    fn bare_outcome_serializes_minimally() {
        let v = serde_json::to_value(SeedOutcome::bare(SeedReason::NoApiKey)).unwrap();
        assert_eq!(v, serde_json::json!({"seeded": false, "reason": "no_api_key"}));
    }
}
