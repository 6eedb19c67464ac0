#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

use contentdeck::ai::{AiError, ChatClient, ChatRequest, ChatResponse, Usage};
use contentdeck::company::PageFetcher;
use contentdeck::config::{self, Config, Secrets};
use contentdeck::crypto::SecretCipher;
use contentdeck::db::{self, Pool};
use contentdeck::dispatch::{Dispatcher, IngestJob};
use contentdeck::imaging::{BackgroundRemover, ImagingError};
use contentdeck::mailer::{Email, Mailer};
use contentdeck::search::{RawArticle, SearchChain, SearchError, SearchProvider};
use contentdeck::state::AppState;

pub fn example_config() -> Config {
    serde_yaml::from_str(config::example()).unwrap()
}

#[derive(Clone, Default)]
pub struct RecordingChat {
    responses: Arc<Mutex<VecDeque<Result<String, AiError>>>>,
    pub calls: Arc<Mutex<Vec<(String, ChatRequest)>>>,
}

impl RecordingChat {
    pub async fn push(&self, response: Result<String, AiError>) {
        self.responses.lock().await.push_back(response);
    }

    pub async fn keys_used(&self) -> Vec<String> {
        self.calls.lock().await.iter().map(|(k, _)| k.clone()).collect()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn complete(&self, api_key: &str, req: &ChatRequest) -> Result<ChatResponse, AiError> {
        self.calls
            .lock()
            .await
            .push((api_key.to_string(), req.clone()));
        let next = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("ok".into()));
        next.map(|content| ChatResponse {
            content,
            model: req.model.clone(),
            usage: Usage {
                prompt_tokens: 12,
                completion_tokens: 34,
            },
        })
    }
}

/// Search provider returning canned articles, or failing every call.
pub struct FixedSearch {
    pub articles: Vec<RawArticle>,
    pub fail: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FixedSearch {
    pub fn with_titles(titles: &[&str]) -> Self {
        let articles = titles
            .iter()
            .enumerate()
            .map(|(i, t)| RawArticle {
                title: Some(t.to_string()),
                summary: Some(format!("summary {i}")),
                url: Some(format!("https://news.test/{}", t.replace(' ', "-"))),
                source: Some("News".into()),
                published_at: None,
            })
            .collect();
        Self {
            articles,
            fail: false,
            calls: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            articles: Vec::new(),
            fail: true,
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl SearchProvider for FixedSearch {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn search_news(&self, topic: &str, limit: usize) -> Result<Vec<RawArticle>, SearchError> {
        self.calls.lock().await.push(topic.to_string());
        if self.fail {
            return Err(SearchError::Parse("provider down".into()));
        }
        Ok(self.articles.iter().take(limit).cloned().collect())
    }

    async fn research(&self, query: &str) -> Result<String, SearchError> {
        self.calls.lock().await.push(query.to_string());
        if self.fail {
            return Err(SearchError::Parse("provider down".into()));
        }
        Ok("Acme makes anvils for coyotes.".into())
    }
}

pub fn chain(provider: FixedSearch) -> SearchChain {
    let providers: Vec<Arc<dyn SearchProvider>> = vec![Arc::new(provider)];
    SearchChain::new(providers)
}

#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    pub fail: bool,
    pub jobs: Arc<Mutex<Vec<IngestJob>>>,
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn dispatch_ingest(&self, job: &IngestJob) -> Result<()> {
        self.jobs.lock().await.push(job.clone());
        if self.fail {
            return Err(anyhow!("event bus unreachable"));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct StaticFetcher {
    pub html: Option<String>,
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.html
            .clone()
            .ok_or_else(|| anyhow!("connection refused: {url}"))
    }
}

#[derive(Clone, Default)]
pub struct RecordingRemover {
    pub keys: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BackgroundRemover for RecordingRemover {
    async fn remove_background(&self, api_key: &str, _image: &[u8]) -> Result<Vec<u8>, ImagingError> {
        self.keys.lock().await.push(api_key.to_string());
        Ok(b"\x89PNG-cutout".to_vec())
    }
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<Email>>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

/// App state wired to in-memory storage and recording fakes.
pub struct Harness {
    pub state: AppState,
    pub chat: RecordingChat,
    pub dispatcher: RecordingDispatcher,
    pub remover: RecordingRemover,
    pub mailer: RecordingMailer,
}

impl Harness {
    pub async fn new() -> Self {
        let pool = db::memory_pool().await.unwrap();
        let chat = RecordingChat::default();
        let dispatcher = RecordingDispatcher::default();
        let remover = RecordingRemover::default();
        let mailer = RecordingMailer::default();
        let secrets = Secrets {
            openrouter_api_key: Some("server-openrouter".into()),
            perplexity_api_key: Some("server-perplexity".into()),
            remove_bg_api_key: Some("server-removebg".into()),
            inngest_signing_key: Some("signkey".into()),
            ..Default::default()
        };
        let state = AppState {
            pool,
            cfg: Arc::new(example_config()),
            secrets: Arc::new(secrets),
            search: chain(FixedSearch::with_titles(&["first story", "second story"])),
            chat: Arc::new(chat.clone()),
            dispatcher: Arc::new(dispatcher.clone()),
            fetcher: Arc::new(StaticFetcher {
                html: Some("<html><body><h1>Acme</h1><p>Anvils since 1949.</p></body></html>".into()),
            }),
            images: Arc::new(remover.clone()),
            mailer: Some(Arc::new(mailer.clone())),
            cipher: Some(SecretCipher::from_bytes(&[3u8; 32]).unwrap()),
        };
        Self {
            state,
            chat,
            dispatcher,
            remover,
            mailer,
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn router(&self) -> Router {
        contentdeck::api::router(self.state.clone())
    }

    /// Create a user with a live session; returns (user_id, token).
    pub async fn login(&self, email: &str) -> (i64, String) {
        let uid = db::get_or_create_user(self.pool(), email, None).await.unwrap();
        let token = format!("tok-{uid}-{email}");
        db::create_session(self.pool(), uid, &token, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        (uid, token)
    }
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}
