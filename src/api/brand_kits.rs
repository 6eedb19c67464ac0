use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::db::{self, BrandKit, NewBrandKit};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBrandKit {
    pub name: String,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub font_family: Option<String>,
    pub logo_url: Option<String>,
    /// Defaults to true: a new kit becomes the active one.
    pub is_active: Option<bool>,
}

fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn clean(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl CreateBrandKit {
    fn into_new(self) -> Result<NewBrandKit, ApiError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::bad_request("name is required"));
        }
        let primary_color = clean(self.primary_color);
        let secondary_color = clean(self.secondary_color);
        for color in [&primary_color, &secondary_color].into_iter().flatten() {
            if !is_hex_color(color) {
                return Err(ApiError::bad_request(format!("invalid color {color}")));
            }
        }
        Ok(NewBrandKit {
            name,
            primary_color,
            secondary_color,
            font_family: clean(self.font_family),
            logo_url: clean(self.logo_url),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<CreateBrandKit>,
) -> Result<(StatusCode, Json<BrandKit>), ApiError> {
    let kit = req.into_new()?;
    match db::create_brand_kit(&state.pool, user_id, &kit).await {
        Ok(row) => Ok((StatusCode::CREATED, Json(row))),
        Err(err) if db::is_unique_violation(&err) => Err(ApiError::Conflict(
            "another brand kit was activated at the same time".into(),
        )),
        Err(err) => Err(err.into()),
    }
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<BrandKit>>, ApiError> {
    Ok(Json(db::list_brand_kits(&state.pool, user_id).await?))
}

pub async fn activate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<BrandKit>, ApiError> {
    match db::activate_brand_kit(&state.pool, user_id, id).await {
        Ok(Some(kit)) => Ok(Json(kit)),
        Ok(None) => Err(ApiError::not_found("brand kit")),
        Err(err) if db::is_unique_violation(&err) => Err(ApiError::Conflict(
            "another brand kit was activated at the same time".into(),
        )),
        Err(err) => Err(err.into()),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if db::delete_brand_kit(&state.pool, user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("brand kit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#0A66C2"));
        assert!(!is_hex_color("0A66C2"));
        assert!(!is_hex_color("#0A66C"));
        assert!(!is_hex_color("#zzzzzz"));
    }

    #[test]
    fn kit_defaults_to_active() {
        let req = CreateBrandKit {
            name: " Main ".into(),
            primary_color: Some(" ".into()),
            secondary_color: None,
            font_family: None,
            logo_url: None,
            is_active: None,
        };
        let kit = req.into_new().unwrap();
        assert!(kit.is_active);
        assert_eq!(kit.name, "Main");
        assert!(kit.primary_color.is_none());
    }
}
