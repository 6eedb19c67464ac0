//! Company-context analysis: the status read model and the background
//! workflow that moves a row from `pending` to `completed` or `failed`.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::ai::{extract_json, ChatMessage, ChatRequest};
use crate::assistant::{complete_for_user, AssistError};
use crate::byok::search_chain_for;
use crate::db::{self, CompanyContext};
use crate::mailer::analysis_complete_email;
use crate::model::{AnalysisStatus, OutboxKind};
use crate::state::AppState;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
pub const MAX_SITE_CHARS: usize = 8000;
const MAX_RESEARCH_CHARS: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInfo {
    pub progress: u8,
    pub message: &'static str,
}

pub fn status_info(status: AnalysisStatus) -> StatusInfo {
    let (progress, message) = match status {
        AnalysisStatus::Pending => (0, "Analysis queued"),
        AnalysisStatus::Scraping => (25, "Reading your website"),
        AnalysisStatus::Researching => (50, "Researching your company"),
        AnalysisStatus::Analyzing => (75, "Extracting brand insights"),
        AnalysisStatus::Completed => (100, "Analysis complete"),
        AnalysisStatus::Failed => (0, "Analysis failed"),
    };
    StatusInfo { progress, message }
}

/// Body of `GET /api/company-context/status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusView {
    pub status: Option<AnalysisStatus>,
    pub progress: u8,
    pub message: Option<&'static str>,
    pub error: Option<String>,
}

impl Default for StatusView {
    fn default() -> Self {
        Self::none()
    }
}

impl StatusView {
    pub fn none() -> Self {
        Self {
            status: None,
            progress: 0,
            message: None,
            error: None,
        }
    }

    pub fn of(status: AnalysisStatus, error: Option<String>) -> Self {
        let info = status_info(status);
        Self {
            status: Some(status),
            progress: info.progress,
            message: Some(info.message),
            error,
        }
    }
}

pub async fn status_for_user(state: &AppState, user_id: i64) -> Result<StatusView> {
    let Some((status, error)) = db::company_status_for_user(&state.pool, user_id).await? else {
        return Ok(StatusView::none());
    };
    match AnalysisStatus::parse(&status) {
        Some(st) => Ok(StatusView::of(st, error)),
        None => {
            warn!(user_id, status, "unknown company-context status");
            Ok(StatusView::none())
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Raw HTML of `url`.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: crate::http_client(FETCH_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;
        if !res.status().is_success() {
            return Err(anyhow!("website returned {}", res.status()));
        }
        Ok(res.text().await?)
    }
}

static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg)\b.*?</(script|style|noscript|svg)\s*>")
        .expect("valid regex")
});
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Visible text of an HTML page, whitespace collapsed, capped at `max_chars`.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let s = SCRIPT_STYLE.replace_all(html, " ");
    let s = COMMENT.replace_all(&s, " ");
    let s = TAG.replace_all(&s, " ");
    let s = s
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let s = SPACE.replace_all(&s, " ");
    s.trim().chars().take(max_chars).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub company_name: String,
    pub website_url: String,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<(String, String), &'static str> {
        let name = self.company_name.trim();
        if name.is_empty() {
            return Err("company_name is required");
        }
        let url = self.website_url.trim();
        let parsed = reqwest::Url::parse(url).map_err(|_| "website_url must be a valid URL")?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err("website_url must be an http(s) URL");
        }
        Ok((name.to_string(), url.to_string()))
    }
}

/// Reset the user's row to `pending` and queue the workflow.
#[instrument(skip_all, fields(user_id = user_id))]
pub async fn start_analysis(
    state: &AppState,
    user_id: i64,
    company_name: &str,
    website_url: &str,
) -> Result<StatusView> {
    let id = db::upsert_company_context(&state.pool, user_id, company_name, website_url).await?;
    let job_id = db::enqueue_outbox(
        &state.pool,
        OutboxKind::AnalyzeCompany,
        &json!({ "context_id": id }),
        Utc::now(),
    )
    .await?;
    info!(context_id = id, job_id, "company analysis queued");
    Ok(StatusView::of(AnalysisStatus::Pending, None))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeJob {
    pub context_id: i64,
}

/// Structured insights the model is asked for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyAnalysis {
    pub industry: String,
    #[serde(default)]
    pub value_proposition: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub tone_of_voice: String,
    #[serde(default)]
    pub content_pillars: Vec<String>,
}

const ANALYSIS_SYSTEM: &str = "You are a brand strategist. From the material provided, answer with one JSON \
object with the keys industry, value_proposition, target_audience, products (array of strings), \
tone_of_voice and content_pillars (array of 3 to 5 strings). No other text.";

enum StepError {
    /// Ends the workflow with `failed` and this message.
    Failed(String),
    /// Storage trouble; the job is retried.
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::Internal(err)
    }
}

impl From<AssistError> for StepError {
    fn from(err: AssistError) -> Self {
        match err {
            AssistError::Internal(err) => StepError::Internal(err),
            other => StepError::Failed(other.to_string()),
        }
    }
}

/// Run the workflow for one row. Provider failures end in `failed`; database
/// errors are returned so the worker retries.
#[instrument(skip_all, fields(context_id = context_id))]
pub async fn run_analysis(state: &AppState, context_id: i64) -> Result<()> {
    let Some(ctx) = db::company_context_by_id(&state.pool, context_id).await? else {
        warn!("company context vanished; dropping job");
        return Ok(());
    };
    if AnalysisStatus::parse(&ctx.status).is_some_and(|s| s.is_terminal()) {
        info!(status = %ctx.status, "analysis already finished");
        return Ok(());
    }

    match analyze(state, &ctx).await {
        Ok(analysis) => {
            let json = serde_json::to_string(&analysis)?;
            db::complete_company_analysis(&state.pool, ctx.id, &json).await?;
            info!(industry = %analysis.industry, "company analysis completed");
            notify(state, &ctx).await;
            Ok(())
        }
        Err(StepError::Failed(msg)) => {
            warn!(error = %msg, "company analysis failed");
            db::set_company_status(&state.pool, ctx.id, AnalysisStatus::Failed, Some(&msg)).await
        }
        Err(StepError::Internal(err)) => Err(err),
    }
}

/// Move an unfinished row to `failed`. Finished rows are left alone.
pub async fn fail_analysis(state: &AppState, context_id: i64, message: &str) -> Result<()> {
    let Some(ctx) = db::company_context_by_id(&state.pool, context_id).await? else {
        return Ok(());
    };
    if AnalysisStatus::parse(&ctx.status).is_some_and(|s| s.is_terminal()) {
        return Ok(());
    }
    db::set_company_status(&state.pool, context_id, AnalysisStatus::Failed, Some(message)).await
}

async fn analyze(state: &AppState, ctx: &CompanyContext) -> Result<CompanyAnalysis, StepError> {
    let pool = &state.pool;

    db::set_company_status(pool, ctx.id, AnalysisStatus::Scraping, None).await?;
    let html = state
        .fetcher
        .fetch_html(&ctx.website_url)
        .await
        .map_err(|e| StepError::Failed(format!("could not read website: {e:#}")))?;
    let site_text = html_to_text(&html, MAX_SITE_CHARS);
    if site_text.is_empty() {
        return Err(StepError::Failed("website has no readable text".into()));
    }
    db::set_website_summary(pool, ctx.id, &site_text).await?;

    db::set_company_status(pool, ctx.id, AnalysisStatus::Researching, None).await?;
    let search = search_chain_for(state, ctx.user_id).await?;
    let research = if search.is_empty() {
        info!("no search key; skipping research");
        None
    } else {
        let query = format!(
            "{} ({}): what the company does, its products, customers and recent news",
            ctx.company_name, ctx.website_url
        );
        match search.research(&query).await {
            Ok(answer) => {
                let answer: String = answer.chars().take(MAX_RESEARCH_CHARS).collect();
                db::set_research_summary(pool, ctx.id, &answer).await?;
                Some(answer)
            }
            Err(err) => {
                warn!(%err, "research failed; continuing with website text only");
                None
            }
        }
    };

    db::set_company_status(pool, ctx.id, AnalysisStatus::Analyzing, None).await?;
    let mut material = format!(
        "Company: {}\nWebsite: {}\n\nWebsite text:\n{}",
        ctx.company_name, ctx.website_url, site_text
    );
    if let Some(research) = research {
        material.push_str("\n\nResearch:\n");
        material.push_str(&research);
    }
    let req = ChatRequest {
        model: state.cfg.providers.openrouter.model.clone(),
        messages: vec![ChatMessage::system(ANALYSIS_SYSTEM), ChatMessage::user(material)],
        temperature: Some(0.2),
        json_mode: true,
    };
    let resp = complete_for_user(state, ctx.user_id, "company_analysis", &req).await?;
    let value = extract_json(&resp.content).map_err(|e| StepError::Failed(e.to_string()))?;
    let analysis: CompanyAnalysis = serde_json::from_value(value)
        .map_err(|e| StepError::Failed(format!("invalid AI response: {e}")))?;
    if analysis.industry.trim().is_empty() {
        return Err(StepError::Failed("invalid AI response: industry is empty".into()));
    }
    Ok(analysis)
}

async fn notify(state: &AppState, ctx: &CompanyContext) {
    let Some(mailer) = &state.mailer else {
        return;
    };
    let email = match db::get_user(&state.pool, ctx.user_id).await {
        Ok(Some(user)) => user.email,
        Ok(None) => None,
        Err(err) => {
            warn!(?err, "could not load user for notification");
            None
        }
    };
    let Some(to) = email else {
        return;
    };
    if let Err(err) = mailer
        .send(&analysis_complete_email(&to, &ctx.company_name))
        .await
    {
        warn!(?err, "analysis notification failed");
    }
}
