mod common;

use axum::body::Body;
use axum::http::Request;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::{Duration, Utc};
use common::{send, Harness};
use contentdeck::ai::AiError;
use contentdeck::db;
use contentdeck::model::KeyProvider;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn health_is_public_and_other_routes_are_not() {
    let h = Harness::new().await;
    let app = h.router();
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/api/dashboard", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({"error": "unauthorized"}));
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let h = Harness::new().await;
    let (_, token) = h.login("a@b.test").await;
    let req = Request::builder()
        .uri("/api/swipe/wishlist")
        .header("cookie", format!("other=1; sb-access-token={token}"))
        .body(Body::empty())
        .unwrap();
    let res = h.router().oneshot(req).await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn quoted_session_cookie_authenticates() {
    let h = Harness::new().await;
    let (_, token) = h.login("a@b.test").await;
    let req = Request::builder()
        .uri("/api/brand-kits")
        .header("cookie", format!("sb-access-token=\"{token}\"; theme=dark"))
        .body(Body::empty())
        .unwrap();
    let res = h.router().oneshot(req).await.unwrap();
    assert_eq!(res.status(), 200);

    let req = Request::builder()
        .uri("/api/brand-kits")
        .header("cookie", "sb-access-token=")
        .body(Body::empty())
        .unwrap();
    let res = h.router().oneshot(req).await.unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn malformed_bodies_are_json_errors() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;

    let (status, body) = send(&app, "POST", "/api/swipe/wishlist", Some(&token), Some(json!({"content": 5}))).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("expected a string"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/carousel/generate",
        Some(&token),
        Some(json!({"topic": "x", "slide_count": 300})),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());
    assert!(h.chat.calls.lock().await.is_empty());

    let (status, body) = send(&app, "POST", "/api/brand-kits", Some(&token), Some(json!({}))).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("missing field `name`"));

    let req = Request::builder()
        .method("POST")
        .uri("/api/swipe/wishlist")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(r#"{"content": "hi"}"#))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), 415);

    let req = Request::builder()
        .method("POST")
        .uri("/api/swipe/wishlist")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), 400);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let h = Harness::new().await;
    let uid = db::get_or_create_user(h.pool(), "old@b.test", None).await.unwrap();
    db::create_session(h.pool(), uid, "stale", Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    let (status, _) = send(&h.router(), "GET", "/api/brand-kits", Some("stale"), None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn wishlist_duplicate_is_conflict() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;
    let item = json!({"content": "Great hook", "author_name": "Jane"});

    let (status, body) = send(&app, "POST", "/api/swipe/wishlist", Some(&token), Some(item.clone())).await;
    assert_eq!(status, 201);
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(&app, "POST", "/api/swipe/wishlist", Some(&token), Some(item.clone())).await;
    assert_eq!(status, 409);
    assert!(body["error"].as_str().unwrap().contains("already"));

    // another user may save the same post
    let (_, other) = h.login("c@d.test").await;
    let (status, _) = send(&app, "POST", "/api/swipe/wishlist", Some(&other), Some(item)).await;
    assert_eq!(status, 201);

    let (status, _) = send(&app, "POST", "/api/swipe/wishlist", Some(&token), Some(json!({"content": " "}))).await;
    assert_eq!(status, 400);

    let uri = format!("/api/swipe/wishlist/{id}");
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, 204);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn brand_kits_keep_one_active() {
    let h = Harness::new().await;
    let app = h.router();
    let (uid, token) = h.login("a@b.test").await;

    let (status, first) = send(&app, "POST", "/api/brand-kits", Some(&token), Some(json!({"name": "One"}))).await;
    assert_eq!(status, 201);
    assert_eq!(first["is_active"], true);

    let (_, second) = send(
        &app,
        "POST",
        "/api/brand-kits",
        Some(&token),
        Some(json!({"name": "Two", "primary_color": "#0A66C2"})),
    )
    .await;
    assert_eq!(second["is_active"], true);

    let (_, third) = send(
        &app,
        "POST",
        "/api/brand-kits",
        Some(&token),
        Some(json!({"name": "Three", "is_active": false})),
    )
    .await;
    assert_eq!(third["is_active"], false);

    let (_, kits) = send(&app, "GET", "/api/brand-kits", Some(&token), None).await;
    let active: Vec<_> = kits
        .as_array()
        .unwrap()
        .iter()
        .filter(|k| k["is_active"] == true)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["name"], "Two");

    let uri = format!("/api/brand-kits/{}/activate", first["id"]);
    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "One");
    let active = db::active_brand_kit(h.pool(), uid).await.unwrap().unwrap();
    assert_eq!(active.name, "One");

    // another user's kit is invisible
    let (_, other) = h.login("c@d.test").await;
    let (status, _) = send(&app, "POST", &uri, Some(&other), None).await;
    assert_eq!(status, 404);

    let (status, _) = send(&app, "POST", "/api/brand-kits", Some(&token), Some(json!({"name": "X", "primary_color": "blue"}))).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn company_status_maps_progress() {
    let h = Harness::new().await;
    let app = h.router();
    let (uid, token) = h.login("a@b.test").await;

    let (status, body) = send(&app, "GET", "/api/company-context/status", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], json!(null));
    assert_eq!(body["progress"], 0);

    let (status, body) = send(
        &app,
        "POST",
        "/api/company-context/analyze",
        Some(&token),
        Some(json!({"company_name": "Acme", "website_url": "https://acme.test"})),
    )
    .await;
    assert_eq!(status, 202);
    assert_eq!(body["status"], "pending");
    assert_eq!(db::count_outbox(h.pool()).await.unwrap(), 1);

    let ctx = db::company_context_for_user(h.pool(), uid).await.unwrap().unwrap();
    db::complete_company_analysis(h.pool(), ctx.id, r#"{"industry":"anvils"}"#)
        .await
        .unwrap();
    let (_, body) = send(&app, "GET", "/api/company-context/status", Some(&token), None).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["progress"], 100);
    assert_eq!(body["message"], "Analysis complete");

    let (status, body) = send(&app, "GET", "/api/company-context", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["analysis"]["industry"], "anvils");
    assert!(body.get("analysis_json").is_none());

    let (status, _) = send(
        &app,
        "POST",
        "/api/company-context/analyze",
        Some(&token),
        Some(json!({"company_name": "Acme", "website_url": "acme.test"})),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn scheduled_post_cancel_only_from_pending() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;

    let past = json!({"content": "hello", "scheduled_for": (Utc::now() - Duration::hours(1)).to_rfc3339()});
    let (status, _) = send(&app, "POST", "/api/scheduled-posts", Some(&token), Some(past)).await;
    assert_eq!(status, 400);

    let long = json!({"content": "x".repeat(3001), "scheduled_for": (Utc::now() + Duration::hours(1)).to_rfc3339()});
    let (status, _) = send(&app, "POST", "/api/scheduled-posts", Some(&token), Some(long)).await;
    assert_eq!(status, 400);

    let ok = json!({
        "content": "hello",
        "scheduled_for": (Utc::now() + Duration::hours(1)).to_rfc3339(),
        "visibility": "connections",
    });
    let (status, post) = send(&app, "POST", "/api/scheduled-posts", Some(&token), Some(ok)).await;
    assert_eq!(status, 201);
    assert_eq!(post["status"], "pending");
    assert_eq!(post["visibility"], "connections");

    let uri = format!("/api/scheduled-posts/{}/cancel", post["id"]);
    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "cancelled");
    let (status, _) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, 409);
    let (status, _) = send(&app, "POST", "/api/scheduled-posts/9999/cancel", Some(&token), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn api_keys_never_leave_in_plaintext() {
    let h = Harness::new().await;
    let app = h.router();
    let (uid, token) = h.login("a@b.test").await;

    let body = json!({"provider": "openrouter", "api_key": "sk-or-v1-abcdef123456"});
    let (status, view) = send(&app, "PUT", "/api/user/api-keys", Some(&token), Some(body)).await;
    assert_eq!(status, 200);
    assert_eq!(view["key_hint"], "sk-…3456");

    let (_, list) = send(&app, "GET", "/api/user/api-keys", Some(&token), None).await;
    assert!(!list.to_string().contains("abcdef"));
    assert_eq!(list[0]["provider"], "openrouter");
    let stored = db::valid_api_key(h.pool(), uid, KeyProvider::Openrouter)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.encrypted_key.contains("abcdef"));

    let (status, _) = send(&app, "PUT", "/api/user/api-keys", Some(&token), Some(json!({"provider": "openai", "api_key": "12345678"}))).await;
    assert_eq!(status, 400);
    let (status, _) = send(&app, "PUT", "/api/user/api-keys", Some(&token), Some(json!({"provider": "tavily", "api_key": "short"}))).await;
    assert_eq!(status, 400);

    let (status, _) = send(&app, "DELETE", "/api/user/api-keys/openrouter", Some(&token), None).await;
    assert_eq!(status, 204);
    let (status, _) = send(&app, "DELETE", "/api/user/api-keys/openrouter", Some(&token), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn api_keys_need_encryption_key() {
    let mut h = Harness::new().await;
    h.state.cipher = None;
    let (_, token) = h.login("a@b.test").await;
    let body = json!({"provider": "tavily", "api_key": "tvly-12345678"});
    let (status, _) = send(&h.router(), "PUT", "/api/user/api-keys", Some(&token), Some(body)).await;
    assert_eq!(status, 503);
}

#[tokio::test]
async fn playground_prefers_byok_and_flags_rejected_keys() {
    let h = Harness::new().await;
    let app = h.router();
    let (uid, token) = h.login("a@b.test").await;

    let (_, _) = send(&app, "POST", "/api/prompts/voice", Some(&token), Some(json!({"content": "Be witty."}))).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/ai/playground",
        Some(&token),
        Some(json!({"prompt": "Write a hook", "prompt_name": "voice"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["content"], "ok");
    assert_eq!(body["usage"]["completion_tokens"], 34);
    {
        let calls = h.chat.calls.lock().await;
        assert_eq!(calls[0].0, "server-openrouter");
        assert_eq!(calls[0].1.messages[0].content, "Be witty.");
    }

    send(
        &app,
        "PUT",
        "/api/user/api-keys",
        Some(&token),
        Some(json!({"provider": "openrouter", "api_key": "sk-or-user-key-1"})),
    )
    .await;
    h.chat.push(Err(AiError::InvalidKey)).await;
    let (status, body) = send(&app, "POST", "/api/ai/playground", Some(&token), Some(json!({"prompt": "again"}))).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "invalid AI provider key");
    assert_eq!(h.chat.keys_used().await[1], "sk-or-user-key-1");
    assert!(db::valid_api_key(h.pool(), uid, KeyProvider::Openrouter)
        .await
        .unwrap()
        .is_none());

    // falls back to the server key once the user key is flagged
    send(&app, "POST", "/api/ai/playground", Some(&token), Some(json!({"prompt": "third"}))).await;
    assert_eq!(h.chat.keys_used().await[2], "server-openrouter");

    let usage: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ai_usage WHERE user_id = ?")
        .bind(uid)
        .fetch_one(h.pool())
        .await
        .unwrap();
    assert_eq!(usage, 3);

    let (status, _) = send(&app, "POST", "/api/ai/playground", Some(&token), Some(json!({"prompt": "x".repeat(8001)}))).await;
    assert_eq!(status, 413);
    let (status, _) = send(&app, "POST", "/api/ai/playground", Some(&token), Some(json!({"prompt": "hi", "prompt_name": "missing"}))).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn playground_without_any_key_is_unavailable() {
    let mut h = Harness::new().await;
    h.state.secrets = std::sync::Arc::new(Default::default());
    let (_, token) = h.login("a@b.test").await;
    let (status, body) = send(&h.router(), "POST", "/api/ai/playground", Some(&token), Some(json!({"prompt": "hi"}))).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "AI provider not configured");
}

#[tokio::test]
async fn carousel_validates_model_output() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;

    let slides: Vec<_> = (0..3)
        .map(|i| json!({"heading": format!("H{i}"), "body": "text"}))
        .collect();
    let answer = format!("```json\n{}\n```", json!({"title": "Deck", "slides": slides}));
    h.chat.push(Ok(answer)).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/carousel/generate",
        Some(&token),
        Some(json!({"topic": "hiring", "slide_count": 3})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["slides"].as_array().unwrap().len(), 3);
    assert!(h.chat.calls.lock().await[0].1.json_mode);

    h.chat.push(Ok(json!({"title": "Deck", "slides": []}).to_string())).await;
    let (status, body) = send(&app, "POST", "/api/carousel/generate", Some(&token), Some(json!({"topic": "hiring"}))).await;
    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().starts_with("invalid AI response"));

    let (status, _) = send(&app, "POST", "/api/carousel/generate", Some(&token), Some(json!({"topic": "hiring", "slide_count": 11}))).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn prompt_rollback_appends_version() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;
    for content in ["v one", "v two"] {
        let (status, _) = send(&app, "POST", "/api/prompts/carousel", Some(&token), Some(json!({"content": content}))).await;
        assert_eq!(status, 201);
    }
    let (status, body) = send(&app, "POST", "/api/prompts/carousel/rollback", Some(&token), Some(json!({"version": 1}))).await;
    assert_eq!(status, 201);
    assert_eq!(body["version"], 3);
    assert_eq!(body["content"], "v one");

    let (_, versions) = send(&app, "GET", "/api/prompts/carousel/versions", Some(&token), None).await;
    let numbers: Vec<i64> = versions
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["version"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    let (status, _) = send(&app, "POST", "/api/prompts/carousel/rollback", Some(&token), Some(json!({"version": 9}))).await;
    assert_eq!(status, 404);
    let (status, _) = send(&app, "GET", "/api/prompts/unknown", Some(&token), None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn remove_background_checks_input_and_uses_key() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;

    let gif = json!({"image_base64": B64.encode(b"GIF89a"), "mime_type": "image/gif"});
    let (status, _) = send(&app, "POST", "/api/images/remove-background", Some(&token), Some(gif)).await;
    assert_eq!(status, 415);

    let bad = json!({"image_base64": "%%%", "mime_type": "image/png"});
    let (status, _) = send(&app, "POST", "/api/images/remove-background", Some(&token), Some(bad)).await;
    assert_eq!(status, 400);

    let png = json!({"image_base64": B64.encode(b"\x89PNG-input"), "mime_type": "image/png"});
    let (status, body) = send(&app, "POST", "/api/images/remove-background", Some(&token), Some(png)).await;
    assert_eq!(status, 200);
    assert_eq!(body["mime_type"], "image/png");
    assert_eq!(B64.decode(body["image_base64"].as_str().unwrap()).unwrap(), b"\x89PNG-cutout");
    assert_eq!(h.remover.keys.lock().await.as_slice(), ["server-removebg".to_string()]);
}

#[tokio::test]
async fn extension_sync_and_dashboard() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/extension/sync",
        Some(&token),
        Some(json!({"type": "analytics", "data": [{"day": "2024-05-01", "impressions": 40}]})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true, "type": "analytics", "upserted": 1, "errors": []}));

    let (status, _) = send(&app, "POST", "/api/extension/sync", Some(&token), Some(json!({"type": "comments", "data": []}))).await;
    assert_eq!(status, 400);

    send(&app, "POST", "/api/swipe/wishlist", Some(&token), Some(json!({"content": "a"}))).await;
    send(&app, "POST", "/api/brand-kits", Some(&token), Some(json!({"name": "Main"}))).await;

    let (status, dash) = send(&app, "GET", "/api/dashboard", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(dash["pending_posts"], 0);
    assert_eq!(dash["wishlist_count"], 1);
    assert_eq!(dash["active_brand_kit"]["name"], "Main");
    assert_eq!(dash["company_status"]["progress"], 0);
    assert_eq!(dash["latest_analytics"]["impressions"], 40);

    // a dropped table reads as an empty section, not an error
    sqlx::query("DROP TABLE swipe_wishlist")
        .execute(h.pool())
        .await
        .unwrap();
    let (status, dash) = send(&app, "GET", "/api/dashboard", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(dash["wishlist_count"], 0);
    assert_eq!(dash["active_brand_kit"]["name"], "Main");
}
