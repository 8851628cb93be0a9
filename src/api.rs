use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::feeds::aggregate::TimelineItem;
use crate::feeds::error::FeedError;
use crate::feeds::group::GroupedFeeds;
use crate::feeds::service::FeedService;
use crate::feeds::types::{AggregateFeedResult, Source, SourceFetchResult};

pub const CACHE_HEADER: &str = "X-Feed-Cache";
const DEFAULT_TIMELINE_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub feeds: Arc<FeedService>,
}

impl AppState {
    pub fn new(feeds: FeedService) -> Self {
        Self {
            feeds: Arc::new(feeds),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sources", get(list_sources))
        .route("/feeds", get(get_feeds))
        .route("/feeds/grouped", get(get_grouped))
        .route("/feeds/timeline", get(get_timeline))
        .route("/feeds/refresh", post(refresh_feeds))
        .route("/feeds/{key}", get(get_source))
        .route("/cache", get(cache_info).delete(clear_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<Source>> {
    Json(state.feeds.registry().sources().to_vec())
}

async fn get_feeds(State(state): State<AppState>) -> impl IntoResponse {
    let load = state.feeds.load().await;
    ([(CACHE_HEADER, load.cache.as_str())], Json(load.result))
}

async fn get_grouped(State(state): State<AppState>) -> impl IntoResponse {
    let load = state.feeds.load().await;
    let grouped: GroupedFeeds = state.feeds.grouped(&load.result);
    ([(CACHE_HEADER, load.cache.as_str())], Json(grouped))
}

#[derive(serde::Deserialize)]
struct TimelineQuery {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    max_age_hours: Option<i64>,
}

async fn get_timeline(
    State(state): State<AppState>,
    Query(q): Query<TimelineQuery>,
) -> Json<Vec<TimelineItem>> {
    let load = state.feeds.load().await;
    let limit = q.limit.unwrap_or(DEFAULT_TIMELINE_LIMIT);
    let max_age = q.max_age_hours.filter(|h| *h > 0).map(Duration::hours);
    Json(load.result.timeline(limit, max_age, Utc::now()))
}

async fn refresh_feeds(State(state): State<AppState>) -> Json<AggregateFeedResult> {
    Json(state.feeds.refresh().await)
}

async fn get_source(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SourceFetchResult>, (StatusCode, String)> {
    match state.feeds.fetch_source(&key).await {
        Ok(r) => Ok(Json(r)),
        Err(e @ FeedError::UnknownSource(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => Err((StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

#[derive(serde::Serialize)]
struct CacheInfo {
    age_seconds: Option<i64>,
    expired: bool,
    ttl_seconds: i64,
}

async fn cache_info(State(state): State<AppState>) -> Json<CacheInfo> {
    let cache = state.feeds.cache();
    Json(CacheInfo {
        age_seconds: cache.age_seconds(),
        expired: cache.is_expired(),
        ttl_seconds: cache.ttl_secs(),
    })
}

async fn clear_cache(State(state): State<AppState>) -> (StatusCode, String) {
    match state.feeds.cache().clear() {
        Ok(()) => (StatusCode::OK, "cleared".to_string()),
        Err(e) => {
            warn!(error = %e, "feed cache clear failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("failed: {e}"))
        }
    }
}
