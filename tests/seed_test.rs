mod common;

use chrono::{Duration, Utc};
use common::{chain, send, FixedSearch, Harness, RecordingDispatcher};
use contentdeck::db;
use contentdeck::dispatch::OutboxDispatcher;
use contentdeck::model::SeedReason;
use contentdeck::outbox;
use contentdeck::search::SearchChain;
use contentdeck::seed::{SeedRequest, Seeder};
use serde_json::json;

fn request(topics: &[&str], force: bool) -> SeedRequest {
    SeedRequest {
        topics: topics.iter().map(|s| s.to_string()).collect(),
        force,
    }
}

fn seeder<'a>(h: &'a Harness, dispatcher: &'a RecordingDispatcher) -> Seeder<'a> {
    Seeder {
        pool: h.pool(),
        search: &h.state.search,
        dispatcher,
        dedup_window_hours: 24,
        max_articles_per_topic: 8,
    }
}

async fn article_count(h: &Harness) -> usize {
    db::list_articles(h.pool(), None, 1000).await.unwrap().len()
}

#[tokio::test]
async fn no_api_key_has_no_side_effects() {
    let mut h = Harness::new().await;
    h.state.search = SearchChain::default();
    let (_, token) = h.login("a@b.test").await;

    let (status, body) = send(
        &h.router(),
        "POST",
        "/api/discover/seed",
        Some(&token),
        Some(json!({"topics": ["ai"]})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"seeded": false, "reason": "no_api_key"}));
    assert!(h.dispatcher.jobs.lock().await.is_empty());
    assert_eq!(article_count(&h).await, 0);
    assert_eq!(db::count_outbox(h.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn dispatch_success_is_triggered() {
    let h = Harness::new().await;
    let dispatcher = RecordingDispatcher::default();
    let out = seeder(&h, &dispatcher)
        .seed(&request(&["AI", "ai", "SaaS"], false))
        .await
        .unwrap();
    assert_eq!(out.reason, SeedReason::Triggered);
    assert!(out.seeded);
    assert!(out.batch_id.is_some());
    let jobs = dispatcher.jobs.lock().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].topics, vec!["ai", "saas"]);
    // nothing ran inline
    assert_eq!(article_count(&h).await, 0);
}

#[tokio::test]
async fn dispatch_failure_falls_back_to_inline_pipeline() {
    let h = Harness::new().await;
    let dispatcher = RecordingDispatcher {
        fail: true,
        ..Default::default()
    };
    let out = seeder(&h, &dispatcher).seed(&request(&["ai"], false)).await.unwrap();
    assert_eq!(out.reason, SeedReason::Success);
    assert_eq!(out.articles, Some(2));
    assert_eq!(article_count(&h).await, 2);

    // a second call inside the window is deduplicated
    let again = seeder(&h, &dispatcher).seed(&request(&["ai"], false)).await.unwrap();
    assert_eq!(again.reason, SeedReason::AlreadyExists);
    assert!(!again.seeded);

    // force skips the dedup gate; the same URLs insert nothing new
    let forced = seeder(&h, &dispatcher).seed(&request(&["ai"], true)).await.unwrap();
    assert_eq!(forced.reason, SeedReason::NoResults);
    assert_eq!(forced.articles, Some(0));
}

#[tokio::test]
async fn expired_window_lets_topic_through() {
    let h = Harness::new().await;
    let failing = RecordingDispatcher {
        fail: true,
        ..Default::default()
    };
    let out = seeder(&h, &failing).seed(&request(&["ai"], false)).await.unwrap();
    assert_eq!(out.reason, SeedReason::Success);

    sqlx::query("UPDATE discover_news_articles SET created_at = ?")
        .bind(Utc::now() - Duration::hours(25))
        .execute(h.pool())
        .await
        .unwrap();

    let dispatcher = RecordingDispatcher::default();
    let out = seeder(&h, &dispatcher).seed(&request(&["ai"], false)).await.unwrap();
    assert_eq!(out.reason, SeedReason::Triggered);
    assert_eq!(dispatcher.jobs.lock().await[0].topics, vec!["ai"]);
}

#[tokio::test]
async fn malformed_seed_body_is_json_400() {
    let h = Harness::new().await;
    let app = h.router();
    let (_, token) = h.login("a@b.test").await;

    let (status, body) = send(&app, "POST", "/api/discover/seed", Some(&token), Some(json!({}))).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("missing field `topics`"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/discover/seed",
        Some(&token),
        Some(json!({"topics": "ai"})),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn provider_failure_yields_no_results() {
    let mut h = Harness::new().await;
    h.state.search = chain(FixedSearch::failing());
    let dispatcher = RecordingDispatcher {
        fail: true,
        ..Default::default()
    };
    let out = seeder(&h, &dispatcher).seed(&request(&["ai"], false)).await.unwrap();
    assert_eq!(out.reason, SeedReason::NoResults);
    assert!(!out.seeded);
    assert_eq!(article_count(&h).await, 0);
}

#[tokio::test]
async fn outbox_dispatch_is_drained_by_worker() {
    let h = Harness::new().await;
    let dispatcher = OutboxDispatcher::new(h.pool().clone());
    let seeder = Seeder {
        pool: h.pool(),
        search: &h.state.search,
        dispatcher: &dispatcher,
        dedup_window_hours: 24,
        max_articles_per_topic: 8,
    };
    let out = seeder.seed(&request(&["ai"], false)).await.unwrap();
    assert_eq!(out.reason, SeedReason::Triggered);
    assert_eq!(db::count_outbox(h.pool()).await.unwrap(), 1);

    assert!(outbox::process_next_task(&h.state, 600, 8).await.unwrap());
    assert_eq!(db::count_outbox(h.pool()).await.unwrap(), 0);
    assert_eq!(article_count(&h).await, 2);
    assert!(!outbox::process_next_task(&h.state, 600, 8).await.unwrap());
}

#[tokio::test]
async fn empty_topics_are_rejected() {
    let h = Harness::new().await;
    let (_, token) = h.login("a@b.test").await;
    let (status, body) = send(
        &h.router(),
        "POST",
        "/api/discover/seed",
        Some(&token),
        Some(json!({"topics": ["  "]})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "at least one topic is required");
}

#[tokio::test]
async fn inngest_callback_runs_pipeline() {
    let h = Harness::new().await;
    let app = h.router();
    let event = json!({
        "name": "discover/news.ingest",
        "data": {"batch_id": "b-1", "topics": [" AI "]},
    });

    let (status, _) = send(&app, "POST", "/api/inngest", Some("wrong"), Some(event.clone())).await;
    assert_eq!(status, 401);
    // the key is checked before the body is read
    let (status, _) = send(&app, "POST", "/api/inngest", None, Some(json!({"name": 5}))).await;
    assert_eq!(status, 401);

    let (status, body) = send(&app, "POST", "/api/inngest", Some("signkey"), Some(json!({"data": {}}))).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().starts_with("invalid event"));

    let empty = json!({
        "name": "discover/news.ingest",
        "data": {"batch_id": "b-0", "topics": ["  "]},
    });
    let (status, body) = send(&app, "POST", "/api/inngest", Some("signkey"), Some(empty)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "at least one topic is required");

    let other = json!({"name": "other/event", "data": {}});
    let (status, _) = send(&app, "POST", "/api/inngest", Some("signkey"), Some(other)).await;
    assert_eq!(status, 400);

    let (status, body) = send(&app, "POST", "/api/inngest", Some("signkey"), Some(event)).await;
    assert_eq!(status, 200);
    assert_eq!(body["inserted"], 2);
    assert_eq!(body["batch_id"], "b-1");
    let stored = db::list_articles(h.pool(), Some("ai"), 10).await.unwrap();
    assert_eq!(stored.len(), 2);

    let (status, body) = send(&app, "GET", "/api/discover/news?topic=AI", Some("nope"), None).await;
    assert_eq!(status, 401);
    assert!(body["error"].is_string());

    let (_, token) = h.login("reader@b.test").await;
    let (status, body) = send(&app, "GET", "/api/discover/news?topic=AI", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 2);
}
