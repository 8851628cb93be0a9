// tests/api_http.rs
//
// HTTP-level tests for the feed Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

mod common;

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::{registry, Script, ScriptedStrategy};
use learning_feeds::api::CACHE_HEADER;
use learning_feeds::feeds::cache::MemoryStore;
use learning_feeds::{create_router, AppState, Category, FeedService};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(script: Script) -> Router {
    let reg = registry(&[
        ("HN", Category::News),
        ("ArXiv", Category::Research),
        ("Reddit", Category::Community),
    ]);
    let svc = FeedService::new(
        Arc::new(reg),
        vec![ScriptedStrategy::new("scripted", script)],
        Arc::new(MemoryStore::new()),
    );
    create_router(AppState::new(svc))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let cache = resp
        .headers()
        .get(CACHE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, cache, bytes)
}

fn json(bytes: &[u8]) -> Json {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router(Script::Items(1));
    let (status, _, body) = send(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "ok");
}

#[tokio::test]
async fn feeds_miss_then_hit() {
    let app = test_router(Script::Items(2));

    let (status, cache, body) = send(&app, "GET", "/feeds").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    let v = json(&body);
    assert_eq!(v["totalCount"], 3);
    assert_eq!(v["successCount"], 3);
    assert_eq!(v["results"][0]["sourceKey"], "HN");
    assert_eq!(v["results"][0]["items"].as_array().unwrap().len(), 2);

    let (_, cache, _) = send(&app, "GET", "/feeds").await;
    assert_eq!(cache.as_deref(), Some("HIT"));
}

#[tokio::test]
async fn grouped_and_timeline_views() {
    let app = test_router(Script::Items(2));

    let (status, _, body) = send(&app, "GET", "/feeds/grouped").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v["news"]["categoryInfo"]["icon"], "📡");
    assert_eq!(v["community"]["sources"][0]["sourceKey"], "Reddit");

    // same two links from each source collapse into two timeline entries
    let (status, _, body) = send(&app, "GET", "/feeds/timeline?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    assert_eq!(v.as_array().unwrap().len(), 2);

    let (_, _, body) = send(&app, "GET", "/feeds/timeline?limit=1").await;
    assert_eq!(json(&body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn single_source_and_unknown_key() {
    let app = test_router(Script::Items(1));

    let (status, _, body) = send(&app, "GET", "/feeds/ArXiv").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], true);

    let (status, _, _) = send(&app, "GET", "/feeds/Nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn outage_is_reported_not_raised() {
    let app = test_router(Script::Fail("offline"));

    let (status, cache, body) = send(&app, "GET", "/feeds").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    let v = json(&body);
    assert_eq!(v["successCount"], 0);
    assert!(v["results"][1]["error"].as_str().unwrap().contains("offline"));

    // nothing cached, so still a miss
    let (_, cache, _) = send(&app, "GET", "/feeds").await;
    assert_eq!(cache.as_deref(), Some("MISS"));

    let (status, _, body) = send(&app, "GET", "/feeds/grouped").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({}));
}

#[tokio::test]
async fn cache_endpoints() {
    let app = test_router(Script::Items(1));

    let (_, _, body) = send(&app, "GET", "/cache").await;
    let v = json(&body);
    assert_eq!(v["expired"], true);
    assert!(v["age_seconds"].is_null());
    assert_eq!(v["ttl_seconds"], 900);

    let (status, _, body) = send(&app, "POST", "/feeds/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["successCount"], 3);

    let (_, _, body) = send(&app, "GET", "/cache").await;
    let v = json(&body);
    assert_eq!(v["expired"], false);
    assert!(v["age_seconds"].as_i64().unwrap() >= 0);

    let (status, _, body) = send(&app, "DELETE", "/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "cleared");

    let (_, cache, _) = send(&app, "GET", "/feeds").await;
    assert_eq!(cache.as_deref(), Some("MISS"));
}

#[tokio::test]
async fn sources_lists_registry_in_order() {
    let app = test_router(Script::Empty);
    let (status, _, body) = send(&app, "GET", "/sources").await;
    assert_eq!(status, StatusCode::OK);
    let v = json(&body);
    let keys: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["HN", "ArXiv", "Reddit"]);
    assert_eq!(v[1]["category"], "research");
}
