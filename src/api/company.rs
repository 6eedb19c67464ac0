use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::auth::AuthUser;
use super::json::ApiJson;
use crate::company::{self, AnalyzeRequest, StatusView};
use crate::db::{self, CompanyContext};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn analyze(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<(StatusCode, Json<StatusView>), ApiError> {
    let (name, url) = req.validate().map_err(ApiError::bad_request)?;
    let view = company::start_analysis(&state, user_id, &name, &url).await?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

pub async fn status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StatusView>, ApiError> {
    Ok(Json(company::status_for_user(&state, user_id).await?))
}

#[derive(Debug, Serialize)]
pub struct CompanyContextView {
    #[serde(flatten)]
    pub context: CompanyContext,
    pub analysis: Option<Value>,
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CompanyContextView>, ApiError> {
    let context = db::company_context_for_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("company context"))?;
    let analysis = context
        .analysis_json
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok());
    Ok(Json(CompanyContextView { context, analysis }))
}
