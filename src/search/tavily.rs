use super::{RawArticle, SearchError, SearchProvider};
use crate::config;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "tavily";

#[derive(Clone)]
pub struct TavilyClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct TavilyResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<RawArticle>,
}

impl TavilyClient {
    pub fn from_config(cfg: &config::Endpoint, api_key: String) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cfg.base_url).context("invalid Tavily base URL")?;
        let http = crate::http_client(Duration::from_secs(30))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    async fn search(&self, body: Value) -> Result<TavilyResponse, SearchError> {
        let endpoint = self
            .base_url
            .join("search")
            .map_err(|e| SearchError::Parse(e.to_string()))?;
        debug!(url = %endpoint, "sending tavily request");
        let res = self
            .http
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status {
                provider: NAME,
                status: status.as_u16(),
                body: text.chars().take(300).collect(),
            });
        }
        serde_json::from_str(&text).map_err(|e| SearchError::Parse(format!("tavily body: {e}")))
    }
}

pub fn news_body(topic: &str, limit: usize) -> Value {
    json!({
        "query": format!("{topic} news"),
        "topic": "news",
        "days": 3,
        "max_results": limit,
        "include_answer": false,
    })
}

/// Tavily's synthesized answer, or the joined snippets when it gave none.
pub fn research_text(resp: &TavilyResponse) -> Option<String> {
    if let Some(answer) = resp.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        return Some(answer.trim().to_string());
    }
    let joined = resp
        .results
        .iter()
        .filter_map(|r| r.summary.as_deref())
        .collect::<Vec<_>>()
        .join("\n");
    (!joined.trim().is_empty()).then_some(joined)
}

#[async_trait]
impl SearchProvider for TavilyClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search_news(&self, topic: &str, limit: usize) -> Result<Vec<RawArticle>, SearchError> {
        let mut resp = self.search(news_body(topic, limit)).await?;
        resp.results.truncate(limit);
        Ok(resp.results)
    }

    async fn research(&self, query: &str) -> Result<String, SearchError> {
        let resp = self
            .search(json!({
                "query": query,
                "search_depth": "advanced",
                "max_results": 5,
                "include_answer": true,
            }))
            .await?;
        research_text(&resp).ok_or_else(|| SearchError::Parse("tavily returned no content".into()))
    }
}
