//! Transactional email through Resend.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::info;

use crate::config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

#[derive(Clone)]
pub struct ResendMailer {
    http: Client,
    base_url: Url,
    api_key: String,
    from: String,
}

impl fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendMailer")
            .field("base_url", &self.base_url)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl ResendMailer {
    pub fn from_config(cfg: &config::Resend, api_key: String) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url).context("invalid Resend base URL")?;
        Ok(Self {
            http: crate::http_client(Duration::from_secs(15))?,
            base_url,
            api_key,
            from: cfg.from.clone(),
        })
    }

    pub fn build_request(&self, email: &Email) -> Result<reqwest::Request> {
        let endpoint = self.base_url.join("emails").context("invalid Resend base URL")?;
        self.http
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
            }))
            .build()
            .context("failed to build Resend request")
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        let request = self.build_request(email)?;
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Resend")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("resend error {}: {}", status, body));
        }
        info!(subject = %email.subject, "email sent");
        Ok(())
    }
}

/// Notification sent when a company analysis finishes.
pub fn analysis_complete_email(to: &str, company_name: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Your {company_name} brand analysis is ready"),
        html: format!(
            "<p>We finished analyzing <strong>{}</strong>.</p>\
             <p>Open your dashboard to review the insights and start generating posts.</p>",
            escape_html(company_name)
        ),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
