// src/feeds/mod.rs
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod group;
pub mod normalize;
pub mod payload;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod strategy;
pub mod transport;
pub mod types;

pub use aggregate::FanOutAggregator;
pub use error::{CacheError, FeedError};
pub use fetcher::ResilientFetcher;
pub use registry::SourceRegistry;
pub use service::FeedService;
pub use types::{AggregateFeedResult, CachedPayload, Category, FeedItem, Source, SourceFetchResult};

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_strategy_attempts_total",
            "Retrieval strategy attempts, by strategy."
        );
        describe_counter!(
            "feed_strategy_failures_total",
            "Retrieval strategy failures (network, status, shape, timeout)."
        );
        describe_counter!(
            "feed_strategy_timeouts_total",
            "Retrieval strategy attempts cut off by their time budget."
        );
        describe_counter!(
            "feed_source_failures_total",
            "Sources whose every strategy failed in a fan-out pass."
        );
        describe_counter!(
            "feed_items_normalized_total",
            "Items produced by the content normalizer."
        );
        describe_counter!("feed_cache_hits_total", "Fresh cache reads.");
        describe_counter!(
            "feed_cache_misses_total",
            "Cache reads that found nothing usable."
        );
        describe_histogram!("feed_parse_ms", "Payload normalization time in milliseconds.");
        describe_histogram!("feed_fetch_ms", "Full fan-out duration in milliseconds.");
    });
}
