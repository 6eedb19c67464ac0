pub mod ai;
pub mod api;
pub mod assistant;
pub mod byok;
pub mod company;
pub mod config;
pub mod crypto;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod extension;
pub mod imaging;
pub mod ingest;
pub mod mailer;
pub mod model;
pub mod outbox;
pub mod search;
pub mod seed;
pub mod state;

use std::time::Duration;

/// Shared reqwest client settings for every outbound provider.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("contentdeck/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}
