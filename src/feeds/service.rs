// src/feeds/service.rs
//! `FeedService` owns the registry, the fan-out and the cache handle, and is
//! the only writer of the cache slot.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::feeds::aggregate::FanOutAggregator;
use crate::feeds::cache::{FeedCache, FileStore, KvStore};
use crate::feeds::config::FeedSettings;
use crate::feeds::error::FeedError;
use crate::feeds::fetcher::ResilientFetcher;
use crate::feeds::group::{group_by_category, GroupedFeeds};
use crate::feeds::registry::SourceRegistry;
use crate::feeds::strategy::{default_strategies, SharedStrategy};
use crate::feeds::transport::ReqwestTransport;
use crate::feeds::types::{AggregateFeedResult, SourceFetchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedLoad {
    pub result: AggregateFeedResult,
    pub cache: CacheStatus,
    pub cached_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct FeedService {
    registry: Arc<SourceRegistry>,
    aggregator: FanOutAggregator,
    cache: FeedCache,
}

impl FeedService {
    pub fn new(
        registry: Arc<SourceRegistry>,
        strategies: Vec<SharedStrategy>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let fetcher = Arc::new(ResilientFetcher::new(registry.clone(), strategies));
        Self {
            registry,
            aggregator: FanOutAggregator::new(fetcher),
            cache: FeedCache::new(store),
        }
    }

    /// Production wiring: reqwest transport, default strategy list, file cache.
    pub fn from_settings(registry: SourceRegistry, settings: &FeedSettings) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        let strategies = default_strategies(transport, settings.strategy_timeout);
        let store = Arc::new(FileStore::new(settings.cache_dir.clone()));
        Ok(Self::new(Arc::new(registry), strategies, store))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    /// Fresh cache entry if there is one, otherwise a live fan-out.
    pub async fn load(&self) -> FeedLoad {
        if let Some(hit) = self.cache.read() {
            return FeedLoad {
                result: hit.data,
                cache: CacheStatus::Hit,
                cached_at: Some(hit.cached_at),
            };
        }
        FeedLoad {
            result: self.refresh().await,
            cache: CacheStatus::Miss,
            cached_at: None,
        }
    }

    /// Always fetches. The cache is overwritten only when at least one
    /// source succeeded; a storage failure is logged and otherwise ignored.
    pub async fn refresh(&self) -> AggregateFeedResult {
        let result = self.aggregator.fetch_all().await;
        if result.success_count == 0 {
            warn!(total = result.total_count, "no feed source succeeded; cache left as is");
            return result;
        }
        match self.cache.write(&result) {
            Ok(()) => info!(success = result.success_count, "feed cache updated"),
            Err(e) => warn!(error = %e, "feed cache write failed"),
        }
        result
    }

    /// Fetch one source live. Unknown keys are an error; fetch failures are
    /// reported in the result like in a full fan-out.
    pub async fn fetch_source(&self, key: &str) -> Result<SourceFetchResult, FeedError> {
        let source = self
            .registry
            .get(key)
            .ok_or_else(|| FeedError::UnknownSource(key.to_string()))?;
        let fetched = self.aggregator.fetcher().fetch(source).await;
        Ok(match fetched {
            Ok(items) => SourceFetchResult::ok(key, items, Utc::now()),
            Err(e) => SourceFetchResult::failed(key, e.to_string(), Utc::now()),
        })
    }

    pub fn grouped(&self, result: &AggregateFeedResult) -> GroupedFeeds {
        group_by_category(result, &self.registry)
    }
}
