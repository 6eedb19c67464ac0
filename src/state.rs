use anyhow::{Context, Result};
use std::sync::Arc;

use crate::ai::{ChatClient, OpenRouterClient};
use crate::company::{HttpFetcher, PageFetcher};
use crate::config::{Config, DispatchMode, Secrets};
use crate::crypto::SecretCipher;
use crate::db::Pool;
use crate::dispatch::{Dispatcher, InngestDispatcher, OutboxDispatcher};
use crate::imaging::{BackgroundRemover, RemoveBgClient};
use crate::mailer::{Mailer, ResendMailer};
use crate::search::SearchChain;

/// Shared by every handler and by the background worker.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub cfg: Arc<Config>,
    pub secrets: Arc<Secrets>,
    /// Built from the server's own search keys.
    pub search: SearchChain,
    pub chat: Arc<dyn ChatClient>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub images: Arc<dyn BackgroundRemover>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub cipher: Option<SecretCipher>,
}

impl AppState {
    pub fn from_config(pool: Pool, cfg: Config, secrets: Secrets) -> Result<Self> {
        let p = &cfg.providers;
        let search = SearchChain::from_keys(
            p,
            secrets.perplexity_api_key.clone(),
            secrets.tavily_api_key.clone(),
        )?;
        let chat: Arc<dyn ChatClient> = Arc::new(OpenRouterClient::from_config(&p.openrouter)?);
        let dispatcher: Arc<dyn Dispatcher> = match cfg.app.dispatch {
            DispatchMode::Inngest => Arc::new(InngestDispatcher::new(
                &p.inngest.event_url,
                secrets.inngest_event_key.clone(),
            )?),
            DispatchMode::Outbox => Arc::new(OutboxDispatcher::new(pool.clone())),
        };
        let mailer = match &secrets.resend_api_key {
            Some(key) => {
                Some(Arc::new(ResendMailer::from_config(&p.resend, key.clone())?) as Arc<dyn Mailer>)
            }
            None => None,
        };
        let cipher = secrets
            .byok_encryption_key
            .as_deref()
            .map(SecretCipher::from_base64)
            .transpose()
            .context("BYOK_ENCRYPTION_KEY")?;

        Ok(Self {
            search,
            chat,
            dispatcher,
            fetcher: Arc::new(HttpFetcher::new()?),
            images: Arc::new(RemoveBgClient::from_config(&p.remove_bg)?),
            mailer,
            cipher,
            pool,
            cfg: Arc::new(cfg),
            secrets: Arc::new(secrets),
        })
    }
}
