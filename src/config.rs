//! Configuration loader and validator for the contentdeck service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub providers: Providers,
    pub discover: Discover,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub bind: String,
    pub poll_interval_ms: u64,
    pub max_backoff_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    #[serde(default)]
    pub dispatch: DispatchMode,
}

/// Where seed requests are enqueued.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Inngest,
    #[default]
    Outbox,
}

/// Third-party endpoints. Keys never live here; see [`Secrets`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Providers {
    pub openrouter: OpenRouter,
    pub perplexity: Perplexity,
    pub tavily: Endpoint,
    pub remove_bg: Endpoint,
    pub resend: Resend,
    pub inngest: Inngest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenRouter {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Perplexity {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resend {
    pub base_url: String,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inngest {
    pub event_url: String,
}

/// Discover/news ingestion knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discover {
    pub dedup_window_hours: i64,
    pub max_articles_per_topic: usize,
}

fn default_max_attempts() -> i32 {
    8
}

/// Provider credentials, read from the environment only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    pub openrouter_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub remove_bg_api_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub inngest_event_key: Option<String>,
    pub inngest_signing_key: Option<String>,
    pub byok_encryption_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "[set]" } else { "[unset]" };
        f.debug_struct("Secrets")
            .field("openrouter_api_key", &set(&self.openrouter_api_key))
            .field("perplexity_api_key", &set(&self.perplexity_api_key))
            .field("tavily_api_key", &set(&self.tavily_api_key))
            .field("remove_bg_api_key", &set(&self.remove_bg_api_key))
            .field("resend_api_key", &set(&self.resend_api_key))
            .field("inngest_event_key", &set(&self.inngest_event_key))
            .field("inngest_signing_key", &set(&self.inngest_signing_key))
            .field("byok_encryption_key", &set(&self.byok_encryption_key))
            .finish()
    }
}

impl Secrets {
    /// Read every provider key from the process environment. Blank values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openrouter_api_key: get("OPENROUTER_API_KEY"),
            perplexity_api_key: get("PERPLEXITY_API_KEY"),
            tavily_api_key: get("TAVILY_API_KEY"),
            remove_bg_api_key: get("REMOVE_BG_API_KEY"),
            resend_api_key: get("RESEND_API_KEY"),
            inngest_event_key: get("INNGEST_EVENT_KEY"),
            inngest_signing_key: get("INNGEST_SIGNING_KEY"),
            byok_encryption_key: get("BYOK_ENCRYPTION_KEY"),
        }
    }

    pub fn has_search_key(&self) -> bool {
        self.perplexity_api_key.is_some() || self.tavily_api_key.is_some()
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/contentdeck.db", self.app.data_dir))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.bind.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::Invalid("app.bind must be a socket address"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    if cfg.app.max_attempts <= 0 {
        return Err(ConfigError::Invalid("app.max_attempts must be > 0"));
    }

    let p = &cfg.providers;
    let urls = [
        (&p.openrouter.base_url, "providers.openrouter.base_url must be an http(s) URL"),
        (&p.perplexity.base_url, "providers.perplexity.base_url must be an http(s) URL"),
        (&p.tavily.base_url, "providers.tavily.base_url must be an http(s) URL"),
        (&p.remove_bg.base_url, "providers.remove_bg.base_url must be an http(s) URL"),
        (&p.resend.base_url, "providers.resend.base_url must be an http(s) URL"),
        (&p.inngest.event_url, "providers.inngest.event_url must be an http(s) URL"),
    ];
    for (url, msg) in urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(msg));
        }
    }
    if p.openrouter.model.trim().is_empty() {
        return Err(ConfigError::Invalid("providers.openrouter.model must be non-empty"));
    }
    if p.openrouter.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("providers.openrouter.timeout_seconds must be > 0"));
    }
    if p.perplexity.model.trim().is_empty() {
        return Err(ConfigError::Invalid("providers.perplexity.model must be non-empty"));
    }
    if !p.resend.from.contains('@') {
        return Err(ConfigError::Invalid("providers.resend.from must be an email address"));
    }

    if cfg.discover.dedup_window_hours <= 0 {
        return Err(ConfigError::Invalid("discover.dedup_window_hours must be > 0"));
    }
    if cfg.discover.max_articles_per_topic == 0 {
        return Err(ConfigError::Invalid("discover.max_articles_per_topic must be > 0"));
    }

    Ok(())
}

/// Returns the canonical example YAML.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  bind: "127.0.0.1:8080"
  poll_interval_ms: 500
  max_backoff_seconds: 600
  max_attempts: 8
  dispatch: outbox

providers:
  openrouter:
    base_url: "https://openrouter.ai/api/v1/"
    model: "openai/gpt-4o-mini"
    timeout_seconds: 60
  perplexity:
    base_url: "https://api.perplexity.ai/"
    model: "sonar"
  tavily:
    base_url: "https://api.tavily.com/"
  remove_bg:
    base_url: "https://api.remove.bg/v1.0/"
  resend:
    base_url: "https://api.resend.com/"
    from: "Contentdeck <noreply@contentdeck.app>"
  inngest:
    event_url: "https://inn.gs/"

discover:
  dedup_window_hours: 24
  max_articles_per_topic: 8
"#
}
