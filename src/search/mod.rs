//! News search providers and the ordered fallback chain over them.
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config;
use crate::db::NewArticle;

pub mod perplexity;
pub mod tavily;

pub use perplexity::PerplexityClient;
pub use tavily::TavilyClient;

const MAX_SUMMARY_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("unparseable response: {0}")]
    Parse(String),
    #[error("no search provider configured")]
    NotConfigured,
}

/// Article as a provider returned it, before validation.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "content", alias = "snippet")]
    pub summary: Option<String>,
    #[serde(default, alias = "link")]
    pub url: Option<String>,
    #[serde(default, alias = "source_name")]
    pub source: Option<String>,
    #[serde(default, alias = "published_date", alias = "date")]
    pub published_at: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recent news articles about `topic`, at most `limit`.
    async fn search_news(&self, topic: &str, limit: usize) -> Result<Vec<RawArticle>, SearchError>;

    /// Free-form research answer for `query`.
    async fn research(&self, query: &str) -> Result<String, SearchError>;
}

/// Providers tried in order; the first `Ok` wins.
#[derive(Clone, Default)]
pub struct SearchChain {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl std::fmt::Debug for SearchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("SearchChain").field("providers", &names).finish()
    }
}

impl SearchChain {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain from whichever keys are present, Perplexity first.
    pub fn from_keys(
        cfg: &config::Providers,
        perplexity_key: Option<String>,
        tavily_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();
        if let Some(key) = perplexity_key {
            providers.push(Arc::new(PerplexityClient::from_config(&cfg.perplexity, key)?));
        }
        if let Some(key) = tavily_key {
            providers.push(Arc::new(TavilyClient::from_config(&cfg.tavily, key)?));
        }
        Ok(Self { providers })
    }

    /// A chain that tries `first` before this chain's own providers.
    pub fn preferring(&self, first: Vec<Arc<dyn SearchProvider>>) -> Self {
        let mut providers = first;
        providers.extend(self.providers.iter().cloned());
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub async fn search_news(&self, topic: &str, limit: usize) -> Result<Vec<RawArticle>, SearchError> {
        let mut last_err = SearchError::NotConfigured;
        for provider in &self.providers {
            match provider.search_news(topic, limit).await {
                Ok(articles) => {
                    debug!(provider = provider.name(), topic, count = articles.len(), "search ok");
                    return Ok(articles);
                }
                Err(err) => {
                    warn!(provider = provider.name(), topic, %err, "search provider failed; trying next");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    pub async fn research(&self, query: &str) -> Result<String, SearchError> {
        let mut last_err = SearchError::NotConfigured;
        for provider in &self.providers {
            match provider.research(query).await {
                Ok(answer) => return Ok(answer),
                Err(err) => {
                    warn!(provider = provider.name(), %err, "research provider failed; trying next");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

/// Validate and trim a provider article. Entries without a title, or with a
/// non-http(s) URL, are rejected.
pub fn normalize_article(topic: &str, raw: &RawArticle) -> Option<NewArticle> {
    let clean = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let title = clean(&raw.title)?;
    let url = match clean(&raw.url) {
        Some(u) if u.starts_with("http://") || u.starts_with("https://") => Some(u),
        Some(_) => return None,
        None => None,
    };
    let summary = clean(&raw.summary).map(|s| {
        if s.chars().count() > MAX_SUMMARY_CHARS {
            s.chars().take(MAX_SUMMARY_CHARS).collect()
        } else {
            s
        }
    });

    Some(NewArticle {
        topic: topic.to_string(),
        title,
        summary,
        url,
        source_name: clean(&raw.source),
        published_at: clean(&raw.published_at),
    })
}
