//! Feed service binary entrypoint.
//! Boots the Axum HTTP server, wiring the feed service, metrics, and the
//! background refresh task.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use learning_feeds::feeds::config::{load_registry_default, FeedSettings};
use learning_feeds::feeds::scheduler::spawn_refresh_task;
use learning_feeds::metrics::Metrics;
use learning_feeds::{create_router, AppState, FeedService};

/// Compact logs by default, JSON when LOG_FORMAT=json. RUST_LOG overrides the filter.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("learning_feeds=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let settings = FeedSettings::from_env();
    init_tracing(settings.json_logs);

    let registry = load_registry_default().context("loading feed sources")?;
    info!(sources = registry.len(), "feed registry loaded");

    let service = FeedService::from_settings(registry, &settings)?;

    let metrics = Metrics::init().context("installing prometheus recorder")?;

    // Warm the cache so the first request is served without waiting on upstreams.
    let warm = service.load().await;
    info!(
        cache = warm.cache.as_str(),
        success = warm.result.success_count,
        total = warm.result.total_count,
        "initial feed load"
    );

    match settings.refresh_interval {
        Some(every) => {
            spawn_refresh_task(service.clone(), every);
        }
        None => warn!("background feed refresh disabled"),
    }

    let router = create_router(AppState::new(service)).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
