use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::ai::AiError;
use crate::assistant::AssistError;
use crate::imaging::{ImageInputError, ImagingError};
use crate::seed::SeedError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    /// A provider failure with the status it maps to.
    #[error("{1}")]
    Provider(StatusCode, String),
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Provider(status, _) => *status,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(err) => {
                error!(?err, "request failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ApiError::Provider(status, err.to_string())
    }
}

impl From<AssistError> for ApiError {
    fn from(err: AssistError) -> Self {
        match err {
            AssistError::Ai(err) => err.into(),
            AssistError::Invalid(msg) => ApiError::BadRequest(msg),
            AssistError::TooLarge(msg) => ApiError::PayloadTooLarge(msg.to_string()),
            AssistError::PromptNotFound(name) => ApiError::NotFound(format!("prompt {name} not found")),
            AssistError::Internal(err) => ApiError::Internal(err),
        }
    }
}

/// Body rejections keep the closed status set: a missing content type is a
/// 415, an oversized body a 413, anything else a 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let msg = rejection.body_text();
        match rejection {
            JsonRejection::MissingJsonContentType(_) => ApiError::UnsupportedMediaType(msg),
            _ if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(msg),
            _ => ApiError::BadRequest(msg),
        }
    }
}

impl From<SeedError> for ApiError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::InvalidTopics(msg) => ApiError::BadRequest(msg.to_string()),
            SeedError::Internal(err) => ApiError::Internal(err),
        }
    }
}

impl From<ImageInputError> for ApiError {
    fn from(err: ImageInputError) -> Self {
        match err {
            ImageInputError::UnsupportedType => ApiError::UnsupportedMediaType(err.to_string()),
            ImageInputError::TooLarge => ApiError::PayloadTooLarge(err.to_string()),
            ImageInputError::BadEncoding | ImageInputError::Empty => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<ImagingError> for ApiError {
    fn from(err: ImagingError) -> Self {
        let status = match err {
            ImagingError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            ImagingError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ImagingError::Rejected(_) => StatusCode::BAD_REQUEST,
            ImagingError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        ApiError::Provider(status, err.to_string())
    }
}
