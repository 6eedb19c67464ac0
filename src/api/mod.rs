//! HTTP surface. Every route except `/api/health` and the Inngest callback
//! requires a session.
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod ai;
pub mod api_keys;
pub mod auth;
pub mod brand_kits;
pub mod company;
pub mod dashboard;
pub mod discover;
pub mod images;
pub mod inngest;
pub mod json;
pub mod prompts;
pub mod scheduled;
pub mod sync;
pub mod wishlist;

/// Base64 of the largest accepted image, plus JSON overhead.
const IMAGE_BODY_LIMIT: usize = 17 * 1024 * 1024;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/inngest", post(inngest::handle))
        .route("/api/discover/seed", post(discover::seed))
        .route("/api/discover/news", get(discover::news))
        .route("/api/company-context", get(company::get))
        .route("/api/company-context/analyze", post(company::analyze))
        .route("/api/company-context/status", get(company::status))
        .route("/api/ai/playground", post(ai::playground))
        .route("/api/carousel/generate", post(ai::carousel))
        .route(
            "/api/images/remove-background",
            post(images::remove_background).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route("/api/brand-kits", post(brand_kits::create).get(brand_kits::list))
        .route("/api/brand-kits/:id", delete(brand_kits::delete))
        .route("/api/brand-kits/:id/activate", post(brand_kits::activate))
        .route("/api/swipe/wishlist", post(wishlist::add).get(wishlist::list))
        .route("/api/swipe/wishlist/:id", delete(wishlist::remove))
        .route("/api/user/api-keys", put(api_keys::put).get(api_keys::list))
        .route("/api/user/api-keys/:provider", delete(api_keys::delete))
        .route("/api/scheduled-posts", post(scheduled::create).get(scheduled::list))
        .route("/api/scheduled-posts/:id/cancel", post(scheduled::cancel))
        .route("/api/prompts/:name", post(prompts::append).get(prompts::latest))
        .route("/api/prompts/:name/versions", get(prompts::versions))
        .route("/api/prompts/:name/rollback", post(prompts::rollback))
        .route("/api/extension/sync", post(sync::sync))
        .route("/api/dashboard", get(dashboard::dashboard))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
