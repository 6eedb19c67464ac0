use super::{RawArticle, SearchError, SearchProvider};
use crate::ai::extract_json;
use crate::config;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "perplexity";

#[derive(Clone)]
pub struct PerplexityClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl fmt::Debug for PerplexityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerplexityClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl PerplexityClient {
    pub fn from_config(cfg: &config::Perplexity, api_key: String) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cfg.base_url).context("invalid Perplexity base URL")?;
        let http = crate::http_client(Duration::from_secs(60))?;
        Ok(Self {
            http,
            base_url,
            api_key,
            model: cfg.model.clone(),
        })
    }

    async fn ask(&self, system: &str, user: &str) -> Result<String, SearchError> {
        let endpoint = self
            .base_url
            .join("chat/completions")
            .map_err(|e| SearchError::Parse(e.to_string()))?;
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        debug!(url = %endpoint, "sending perplexity request");
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
        answer_content(&text)
    }
}

#[derive(Deserialize)]
struct Answer {
    choices: Vec<AnswerChoice>,
}

#[derive(Deserialize)]
struct AnswerChoice {
    message: AnswerMessage,
}

#[derive(Deserialize)]
struct AnswerMessage {
    content: String,
}

fn answer_content(body: &str) -> Result<String, SearchError> {
    let answer: Answer =
        serde_json::from_str(body).map_err(|e| SearchError::Parse(format!("perplexity body: {e}")))?;
    answer
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| SearchError::Parse("perplexity returned no choices".into()))
}

/// The model is asked for a bare JSON array; accept `{"articles": [...]}` too.
pub fn parse_article_list(content: &str) -> Result<Vec<RawArticle>, SearchError> {
    let value = extract_json(content).map_err(|e| SearchError::Parse(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("articles") {
            Some(Value::Array(items)) => items,
            _ => return Err(SearchError::Parse("expected a JSON array of articles".into())),
        },
        _ => return Err(SearchError::Parse("expected a JSON array of articles".into())),
    };
    // Skip entries that are not objects rather than failing the whole answer.
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawArticle>(item).ok())
        .collect())
}

fn news_prompt(topic: &str, limit: usize) -> String {
    format!(
        "List up to {limit} notable news articles from the last 48 hours about \"{topic}\" \
         that a LinkedIn creator could comment on. Respond with only a JSON array; each \
         element has the keys title, summary, url, source, published_at."
    )
}

#[async_trait]
impl SearchProvider for PerplexityClient {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search_news(&self, topic: &str, limit: usize) -> Result<Vec<RawArticle>, SearchError> {
        let content = self
            .ask("You are a precise news researcher. Output JSON only.", &news_prompt(topic, limit))
            .await?;
        let mut articles = parse_article_list(&content)?;
        articles.truncate(limit);
        Ok(articles)
    }

    async fn research(&self, query: &str) -> Result<String, SearchError> {
        self.ask(
            "You are a business analyst. Answer factually in under 300 words.",
            query,
        )
        .await
    }
}
