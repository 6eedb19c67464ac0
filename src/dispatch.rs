//! Asynchronous hand-off of ingestion batches.
//!
//! Seeding first tries a [`Dispatcher`]; when it fails the caller runs the
//! pipeline in-process instead.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::info;

use crate::db::{self, Pool};
use crate::model::OutboxKind;

/// Inngest event name for a news ingestion batch.
pub const INGEST_EVENT: &str = "discover/news.ingest";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestJob {
    pub batch_id: String,
    pub topics: Vec<String>,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch_ingest(&self, job: &IngestJob) -> Result<()>;
}

/// Sends events to Inngest, which calls back `/api/inngest` to run them.
#[derive(Clone)]
pub struct InngestDispatcher {
    http: Client,
    event_url: Url,
    event_key: Option<String>,
}

impl fmt::Debug for InngestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InngestDispatcher")
            .field("event_url", &self.event_url)
            .field("has_key", &self.event_key.is_some())
            .finish()
    }
}

impl InngestDispatcher {
    pub fn new(event_url: &str, event_key: Option<String>) -> Result<Self> {
        let event_url = Url::parse(event_url).context("invalid Inngest event URL")?;
        let http = crate::http_client(Duration::from_secs(10))?;
        Ok(Self {
            http,
            event_url,
            event_key,
        })
    }

    pub fn build_request(&self, job: &IngestJob) -> Result<reqwest::Request> {
        let key = self
            .event_key
            .as_deref()
            .ok_or_else(|| anyhow!("INNGEST_EVENT_KEY is not set"))?;
        let endpoint = self
            .event_url
            .join(&format!("e/{key}"))
            .context("invalid Inngest event URL")?;
        self.http
            .post(endpoint)
            .json(&json!({
                "name": INGEST_EVENT,
                "id": job.batch_id,
                "data": job,
            }))
            .build()
            .context("failed to build Inngest request")
    }
}

#[async_trait]
impl Dispatcher for InngestDispatcher {
    fn name(&self) -> &'static str {
        "inngest"
    }

    async fn dispatch_ingest(&self, job: &IngestJob) -> Result<()> {
        let request = self.build_request(job)?;
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Inngest")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("inngest error {}: {}", status, body));
        }
        info!(batch_id = %job.batch_id, "ingest event sent to inngest");
        Ok(())
    }
}

/// Queues the batch in the local outbox table for the background worker.
#[derive(Debug, Clone)]
pub struct OutboxDispatcher {
    pool: Pool,
}

impl OutboxDispatcher {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Dispatcher for OutboxDispatcher {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn dispatch_ingest(&self, job: &IngestJob) -> Result<()> {
        let payload = serde_json::to_value(job)?;
        let id = db::enqueue_outbox(&self.pool, OutboxKind::IngestNews, &payload, Utc::now()).await?;
        info!(batch_id = %job.batch_id, outbox_id = id, "ingest batch queued");
        Ok(())
    }
}
