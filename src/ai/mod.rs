//! Chat-completion client abstraction and the fixed error → status table.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod openrouter;

pub use openrouter::OpenRouterClient;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider rejected the request: {0}")]
    BadRequest(String),
    #[error("invalid AI provider key")]
    InvalidKey,
    #[error("insufficient AI credits")]
    InsufficientCredits,
    #[error("request flagged by moderation: {0}")]
    Moderation(String),
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("AI rate limit reached")]
    RateLimited,
    #[error("AI provider unavailable: {0}")]
    Unavailable(String),
    #[error("AI request timed out")]
    Timeout,
    #[error("invalid AI response: {0}")]
    InvalidResponse(String),
    #[error("AI provider not configured")]
    NotConfigured,
}

impl AiError {
    /// HTTP status surfaced to our own callers.
    pub fn status_code(&self) -> u16 {
        match self {
            AiError::BadRequest(_) => 400,
            AiError::InvalidKey => 401,
            AiError::InsufficientCredits => 402,
            AiError::Moderation(_) => 403,
            AiError::ModelNotFound(_) => 404,
            AiError::RateLimited => 429,
            AiError::InvalidResponse(_) => 500,
            AiError::Unavailable(_) | AiError::NotConfigured => 503,
            AiError::Timeout => 504,
        }
    }

    /// Classify an upstream HTTP failure.
    pub fn from_upstream(status: u16, body: &str) -> Self {
        let detail = upstream_message(body);
        match status {
            400 | 422 => AiError::BadRequest(detail),
            401 => AiError::InvalidKey,
            402 => AiError::InsufficientCredits,
            403 => AiError::Moderation(detail),
            404 => AiError::ModelNotFound(detail),
            408 | 504 => AiError::Timeout,
            429 => AiError::RateLimited,
            _ => AiError::Unavailable(format!("upstream status {status}")),
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::Timeout
        } else if err.is_decode() {
            AiError::InvalidResponse(err.to_string())
        } else {
            AiError::Unavailable(err.to_string())
        }
    }
}

/// Pull `error.message` out of an OpenAI-style error body, or fall back to the raw text.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response.
    pub json_mode: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// One completion, using `api_key` for this call only.
    async fn complete(&self, api_key: &str, req: &ChatRequest) -> Result<ChatResponse, AiError>;
}

/// Parse the JSON payload of a model answer, tolerating markdown fences and
/// prose around the object or array.
pub fn extract_json(content: &str) -> Result<Value, AiError> {
    let trimmed = content.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }

    let unfenced = strip_code_fence(trimmed);
    if let Ok(v) = serde_json::from_str::<Value>(unfenced) {
        return Ok(v);
    }

    let start = unfenced.find(['{', '[']);
    let end = unfenced.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if e > s => serde_json::from_str::<Value>(&unfenced[s..=e])
            .map_err(|err| AiError::InvalidResponse(format!("malformed JSON: {err}"))),
        _ => Err(AiError::InvalidResponse("no JSON found in model output".into())),
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop the language tag line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_is_fixed() {
        let cases = [
            (AiError::BadRequest("x".into()), 400),
            (AiError::InvalidKey, 401),
            (AiError::InsufficientCredits, 402),
            (AiError::Moderation("x".into()), 403),
            (AiError::ModelNotFound("x".into()), 404),
            (AiError::RateLimited, 429),
            (AiError::InvalidResponse("x".into()), 500),
            (AiError::Unavailable("x".into()), 503),
            (AiError::NotConfigured, 503),
            (AiError::Timeout, 504),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn upstream_statuses_are_classified() {
        assert!(matches!(
            AiError::from_upstream(402, r#"{"error":{"message":"no credits"}}"#),
            AiError::InsufficientCredits
        ));
        match AiError::from_upstream(403, r#"{"error":{"message":"flagged"}}"#) {
            AiError::Moderation(msg) => assert_eq!(msg, "flagged"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(AiError::from_upstream(502, "bad gateway"), AiError::Unavailable(_)));
        assert!(matches!(AiError::from_upstream(429, ""), AiError::RateLimited));
    }

    #[test]
    fn extract_json_handles_fences_and_prose() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(fenced).unwrap()["a"], 1);

        let prose = "Here you go:\n[{\"title\": \"x\"}]\nEnjoy!";
        assert_eq!(extract_json(prose).unwrap()[0]["title"], "x");

        assert!(matches!(
            extract_json("no json here"),
            Err(AiError::InvalidResponse(_))
        ));
    }
}
