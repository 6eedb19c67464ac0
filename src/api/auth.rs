//! Session authentication for API routes.
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use axum::{async_trait, RequestPartsExt};
use tower_cookies::Cookies;

use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sb-access-token";

/// The signed-in user, resolved from a bearer token or the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Session cookie value with any surrounding quotes removed.
fn session_cookie(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value_trimmed().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers) {
            Some(token) => token.to_string(),
            None => {
                let cookies = parts
                    .extract::<Cookies>()
                    .await
                    .map_err(|_| ApiError::Unauthorized)?;
                session_cookie(&cookies).ok_or(ApiError::Unauthorized)?
            }
        };
        let user_id = db::session_user(&state.pool, &token)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(AuthUser(user_id))
    }
}
