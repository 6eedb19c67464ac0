//! Per-user provider keys, falling back to the server's own.
use anyhow::Result;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::db;
use crate::model::KeyProvider;
use crate::search::{PerplexityClient, SearchChain, SearchProvider, TavilyClient};
use crate::state::AppState;

#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub value: String,
    /// True when the key came from the user's stored credentials.
    pub byok: bool,
}

impl std::fmt::Debug for ResolvedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedKey")
            .field("byok", &self.byok)
            .finish_non_exhaustive()
    }
}

fn server_key(state: &AppState, provider: KeyProvider) -> Option<&str> {
    let s = &state.secrets;
    match provider {
        KeyProvider::Openrouter => s.openrouter_api_key.as_deref(),
        KeyProvider::Perplexity => s.perplexity_api_key.as_deref(),
        KeyProvider::Tavily => s.tavily_api_key.as_deref(),
        KeyProvider::RemoveBg => s.remove_bg_api_key.as_deref(),
    }
}

/// The user's own valid key if it decrypts, else the server key.
async fn user_key(state: &AppState, user_id: i64, provider: KeyProvider) -> Result<Option<String>> {
    let Some(cipher) = &state.cipher else {
        return Ok(None);
    };
    let Some(stored) = db::valid_api_key(&state.pool, user_id, provider).await? else {
        return Ok(None);
    };
    match cipher.open(&stored.encrypted_key) {
        Ok(plain) => Ok(Some(plain)),
        Err(err) => {
            warn!(user_id, provider = provider.as_str(), %err, "stored key unreadable; using server key");
            Ok(None)
        }
    }
}

#[instrument(skip_all, fields(provider = provider.as_str()))]
pub async fn resolve_key(
    state: &AppState,
    user_id: i64,
    provider: KeyProvider,
) -> Result<Option<ResolvedKey>> {
    if let Some(value) = user_key(state, user_id, provider).await? {
        return Ok(Some(ResolvedKey { value, byok: true }));
    }
    Ok(server_key(state, provider).map(|v| ResolvedKey {
        value: v.to_string(),
        byok: false,
    }))
}

/// The server chain, with the user's own search keys tried first.
pub async fn search_chain_for(state: &AppState, user_id: i64) -> Result<SearchChain> {
    let providers = &state.cfg.providers;
    let mut first: Vec<Arc<dyn SearchProvider>> = Vec::new();
    if let Some(key) = user_key(state, user_id, KeyProvider::Perplexity).await? {
        first.push(Arc::new(PerplexityClient::from_config(&providers.perplexity, key)?));
    }
    if let Some(key) = user_key(state, user_id, KeyProvider::Tavily).await? {
        first.push(Arc::new(TavilyClient::from_config(&providers.tavily, key)?));
    }
    if first.is_empty() {
        return Ok(state.search.clone());
    }
    Ok(state.search.preferring(first))
}
