use super::{AiError, ChatClient, ChatRequest, ChatResponse, Usage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config;

#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenRouterClient {
    pub fn from_config(cfg: &config::OpenRouter) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url).context("invalid OpenRouter base URL")?;
        Self::with_base_url(base_url, Duration::from_secs(cfg.timeout_seconds))
    }

    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = crate::http_client(timeout)?;
        Ok(Self { http, base_url })
    }

    pub fn build_request(&self, api_key: &str, req: &ChatRequest) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join("chat/completions")
            .context("invalid OpenRouter base URL")?;
        self.http
            .post(endpoint)
            .bearer_auth(api_key)
            .header("X-Title", "contentdeck")
            .json(&build_chat_body(req))
            .build()
            .context("failed to build OpenRouter request")
    }
}

pub fn build_chat_body(req: &ChatRequest) -> Value {
    let mut body = json!({
        "model": req.model,
        "messages": req.messages,
    });
    if let Some(t) = req.temperature {
        body["temperature"] = json!(t);
    }
    if req.json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Turn a successful completion body into a [`ChatResponse`].
pub fn parse_completion(body: &str, requested_model: &str) -> Result<ChatResponse, AiError> {
    let payload: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| AiError::InvalidResponse(format!("completion body: {e}")))?;
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AiError::InvalidResponse("empty completion".into()))?;
    Ok(ChatResponse {
        content,
        model: payload.model.unwrap_or_else(|| requested_model.to_string()),
        usage: payload.usage,
    })
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn complete(&self, api_key: &str, req: &ChatRequest) -> Result<ChatResponse, AiError> {
        let request = self
            .build_request(api_key, req)
            .map_err(|e| AiError::BadRequest(e.to_string()))?;
        debug!(url = %request.url(), model = %req.model, "sending completion request");

        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(AiError::from_upstream(status.as_u16(), &body));
        }
        parse_completion(&body, &req.model)
    }
}
