// src/lib.rs
// Public library surface for the server binary and integration tests.

pub mod api;
pub mod feeds;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::feeds::{
    AggregateFeedResult, Category, FeedError, FeedItem, FeedService, Source, SourceFetchResult,
    SourceRegistry,
};
