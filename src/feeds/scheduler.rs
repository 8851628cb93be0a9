// src/feeds/scheduler.rs
use metrics::{counter, gauge};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::feeds::service::FeedService;

/// Re-run the full fan-out every `interval`. This is the only retry there is:
/// sources that failed in one pass get another chance in the next one.
pub fn spawn_refresh_task(service: FeedService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick fires immediately; the server already warms the cache via load()
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp().max(0);
            let result = service.refresh().await;

            counter!("feed_refresh_runs_total").increment(1);
            gauge!("feed_refresh_last_run_ts").set(now as f64);

            tracing::info!(
                target: "feeds",
                success = result.success_count,
                total = result.total_count,
                "scheduled feed refresh"
            );
        }
    })
}
