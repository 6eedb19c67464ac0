//! AI wrapper features: usage-logged completions, the prompt playground and
//! carousel generation.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::ai::{extract_json, AiError, ChatMessage, ChatRequest, ChatResponse, Usage};
use crate::byok::resolve_key;
use crate::db::{self, UsageRecord};
use crate::model::KeyProvider;
use crate::state::AppState;

pub const MAX_PROMPT_CHARS: usize = 8000;
pub const MIN_SLIDES: u8 = 3;
pub const MAX_SLIDES: u8 = 10;
pub const DEFAULT_SLIDES: u8 = 5;
pub const CAROUSEL_PROMPT: &str = "carousel";

const DEFAULT_CAROUSEL_SYSTEM: &str = "You write LinkedIn carousels. Answer with a single JSON object \
{\"title\": string, \"slides\": [{\"heading\": string, \"body\": string}]} and nothing else. \
Headings stay under 60 characters; bodies under 280.";

#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    TooLarge(&'static str),
    #[error("prompt not found: {0}")]
    PromptNotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// One completion on the user's behalf. Resolves the key, logs usage whatever
/// the outcome, and flags a rejected BYOK key as invalid.
#[instrument(skip_all, fields(user_id = user_id, feature = feature))]
pub async fn complete_for_user(
    state: &AppState,
    user_id: i64,
    feature: &str,
    req: &ChatRequest,
) -> Result<ChatResponse, AssistError> {
    let key = resolve_key(state, user_id, KeyProvider::Openrouter)
        .await?
        .ok_or(AiError::NotConfigured)?;

    let started = Instant::now();
    let result = state.chat.complete(&key.value, req).await;
    let latency_ms = started.elapsed().as_millis() as i64;

    let (model, usage, success) = match &result {
        Ok(resp) => (resp.model.as_str(), resp.usage, true),
        Err(_) => (req.model.as_str(), Usage::default(), false),
    };
    let record = UsageRecord {
        user_id: Some(user_id),
        feature,
        model,
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        latency_ms,
        success,
    };
    if let Err(err) = db::record_ai_usage(&state.pool, &record).await {
        warn!(?err, "failed to record AI usage");
    }

    if let Err(AiError::InvalidKey) = &result {
        if key.byok {
            warn!(user_id, "user OpenRouter key rejected; marking invalid");
            db::mark_api_key_invalid(&state.pool, user_id, KeyProvider::Openrouter).await?;
        }
    }
    Ok(result?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaygroundRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub prompt_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaygroundResponse {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

fn check_temperature(t: Option<f32>) -> Result<(), AssistError> {
    match t {
        Some(t) if !(0.0..=2.0).contains(&t) => {
            Err(AssistError::Invalid("temperature must be between 0 and 2".into()))
        }
        _ => Ok(()),
    }
}

pub async fn playground(
    state: &AppState,
    user_id: i64,
    req: &PlaygroundRequest,
) -> Result<PlaygroundResponse, AssistError> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(AssistError::Invalid("prompt is required".into()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AssistError::TooLarge("prompt exceeds 8000 characters"));
    }
    check_temperature(req.temperature)?;

    let system = match req.prompt_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(
            db::latest_prompt(&state.pool, name)
                .await?
                .ok_or_else(|| AssistError::PromptNotFound(name.to_string()))?
                .content,
        ),
        _ => req.system_prompt.clone().filter(|s| !s.trim().is_empty()),
    };

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt));

    let model = req
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(state.cfg.providers.openrouter.model.as_str())
        .to_string();
    let chat = ChatRequest {
        model,
        messages,
        temperature: req.temperature,
        json_mode: false,
    };
    let resp = complete_for_user(state, user_id, "playground", &chat).await?;
    Ok(PlaygroundResponse {
        content: resp.content,
        model: resp.model,
        usage: resp.usage,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarouselRequest {
    pub topic: String,
    #[serde(default)]
    pub slide_count: Option<u8>,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slide {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Carousel {
    pub title: String,
    pub slides: Vec<Slide>,
}

/// Accept the model's answer only if it has exactly `expected` non-empty slides.
pub fn parse_carousel(value: Value, expected: usize) -> Result<Carousel, AiError> {
    let carousel: Carousel = serde_json::from_value(value)
        .map_err(|e| AiError::InvalidResponse(format!("carousel shape: {e}")))?;
    if carousel.title.trim().is_empty() {
        return Err(AiError::InvalidResponse("carousel has no title".into()));
    }
    if carousel.slides.len() != expected {
        return Err(AiError::InvalidResponse(format!(
            "expected {expected} slides, got {}",
            carousel.slides.len()
        )));
    }
    if carousel
        .slides
        .iter()
        .any(|s| s.heading.trim().is_empty() || s.body.trim().is_empty())
    {
        return Err(AiError::InvalidResponse("empty slide".into()));
    }
    Ok(carousel)
}

pub async fn generate_carousel(
    state: &AppState,
    user_id: i64,
    req: &CarouselRequest,
) -> Result<Carousel, AssistError> {
    let topic = req.topic.trim();
    if topic.is_empty() {
        return Err(AssistError::Invalid("topic is required".into()));
    }
    if topic.chars().count() > MAX_PROMPT_CHARS {
        return Err(AssistError::TooLarge("topic exceeds 8000 characters"));
    }
    let slides = req.slide_count.unwrap_or(DEFAULT_SLIDES);
    if !(MIN_SLIDES..=MAX_SLIDES).contains(&slides) {
        return Err(AssistError::Invalid(format!(
            "slide_count must be between {MIN_SLIDES} and {MAX_SLIDES}"
        )));
    }

    let system = db::latest_prompt(&state.pool, CAROUSEL_PROMPT)
        .await?
        .map(|p| p.content)
        .unwrap_or_else(|| DEFAULT_CAROUSEL_SYSTEM.to_string());
    let tone = req
        .tone
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("professional");
    let user = format!("Topic: {topic}\nTone: {tone}\nWrite exactly {slides} slides.");

    let chat = ChatRequest {
        model: state.cfg.providers.openrouter.model.clone(),
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        temperature: Some(0.7),
        json_mode: true,
    };
    let resp = complete_for_user(state, user_id, "carousel", &chat).await?;
    let value = extract_json(&resp.content)?;
    Ok(parse_carousel(value, slides as usize)?)
}
