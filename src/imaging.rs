//! Background removal through remove.bg.
use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config;

pub const MAX_IMAGE_BYTES: usize = 12 * 1024 * 1024;
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

#[derive(Debug, Error)]
pub enum ImagingError {
    #[error("remove.bg credits exhausted")]
    InsufficientCredits,
    #[error("remove.bg rate limit reached")]
    RateLimited,
    #[error("remove.bg rejected the image: {0}")]
    Rejected(String),
    #[error("remove.bg unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ImagingError {
    fn from(err: reqwest::Error) -> Self {
        ImagingError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Returns PNG bytes with the background removed.
    async fn remove_background(&self, api_key: &str, image: &[u8]) -> Result<Vec<u8>, ImagingError>;
}

#[derive(Clone)]
pub struct RemoveBgClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for RemoveBgClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveBgClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoveBgClient {
    pub fn from_config(cfg: &config::Endpoint) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cfg.base_url).context("invalid remove.bg base URL")?;
        Ok(Self {
            http: crate::http_client(Duration::from_secs(60))?,
            base_url,
        })
    }
}

#[derive(Deserialize)]
struct RemoveBgResponse {
    data: RemoveBgData,
}

#[derive(Deserialize)]
struct RemoveBgData {
    result_b64: String,
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, api_key: &str, image: &[u8]) -> Result<Vec<u8>, ImagingError> {
        let endpoint = self
            .base_url
            .join("removebg")
            .map_err(|e| ImagingError::Unavailable(e.to_string()))?;
        debug!(url = %endpoint, bytes = image.len(), "sending remove.bg request");
        let res = self
            .http
            .post(endpoint)
            .header("X-Api-Key", api_key)
            .header("Accept", "application/json")
            .json(&json!({
                "image_file_b64": B64.encode(image),
                "size": "auto",
                "format": "png",
            }))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        match status {
            s if s.is_success() => {
                let payload: RemoveBgResponse = serde_json::from_str(&body)
                    .map_err(|e| ImagingError::Unavailable(format!("bad response: {e}")))?;
                B64.decode(payload.data.result_b64)
                    .map_err(|e| ImagingError::Unavailable(format!("bad image data: {e}")))
            }
            StatusCode::PAYMENT_REQUIRED => Err(ImagingError::InsufficientCredits),
            StatusCode::TOO_MANY_REQUESTS => Err(ImagingError::RateLimited),
            StatusCode::BAD_REQUEST => Err(ImagingError::Rejected(body.chars().take(200).collect())),
            s => Err(ImagingError::Unavailable(format!("upstream status {s}"))),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageInputError {
    #[error("unsupported image type")]
    UnsupportedType,
    #[error("image is not valid base64")]
    BadEncoding,
    #[error("image exceeds the size limit")]
    TooLarge,
    #[error("image is empty")]
    Empty,
}

/// Check the mime type and decode the payload, accepting data-URL prefixes.
pub fn decode_image(mime_type: &str, image_base64: &str) -> Result<Vec<u8>, ImageInputError> {
    if !ACCEPTED_MIME_TYPES.contains(&mime_type) {
        return Err(ImageInputError::UnsupportedType);
    }
    let data = image_base64
        .split_once(";base64,")
        .map_or(image_base64, |(_, d)| d)
        .trim();
    // base64 expands by 4/3; reject early before allocating
    if data.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
        return Err(ImageInputError::TooLarge);
    }
    let bytes = B64.decode(data).map_err(|_| ImageInputError::BadEncoding)?;
    if bytes.is_empty() {
        return Err(ImageInputError::Empty);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageInputError::TooLarge);
    }
    Ok(bytes)
}
