// src/feeds/fetcher.rs
//! Resilient fetcher: walk the strategy list until one yields items.

use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::feeds::error::FeedError;
use crate::feeds::registry::SourceRegistry;
use crate::feeds::strategy::SharedStrategy;
use crate::feeds::types::{FeedItem, Source};

/// Items from the winning strategy plus the failures recorded before it.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub items: Vec<FeedItem>,
    pub strategy: String,
    pub failures: Vec<String>,
}

#[derive(Clone)]
pub struct ResilientFetcher {
    registry: Arc<SourceRegistry>,
    strategies: Vec<SharedStrategy>,
}

impl ResilientFetcher {
    pub fn new(registry: Arc<SourceRegistry>, strategies: Vec<SharedStrategy>) -> Self {
        Self {
            registry,
            strategies,
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Fetch a registered source by key.
    pub async fn fetch_source(&self, key: &str) -> Result<Vec<FeedItem>, FeedError> {
        let source = self
            .registry
            .get(key)
            .ok_or_else(|| FeedError::UnknownSource(key.to_string()))?;
        self.fetch(source).await
    }

    pub async fn fetch(&self, source: &Source) -> Result<Vec<FeedItem>, FeedError> {
        self.fetch_detailed(source).await.map(|r| r.items)
    }

    /// Strategies run strictly in order. The first non-empty result wins and
    /// later strategies are never attempted; an empty result counts as a
    /// soft failure.
    pub async fn fetch_detailed(&self, source: &Source) -> Result<FetchReport, FeedError> {
        let mut failures = Vec::new();

        for (i, strategy) in self.strategies.iter().enumerate() {
            let label = strategy.label().to_string();
            let budget = strategy.timeout();
            counter!("feed_strategy_attempts_total", "strategy" => label.clone()).increment(1);

            let outcome = match tokio::time::timeout(budget, strategy.attempt(source)).await {
                Ok(r) => r,
                Err(_) => Err(FeedError::Timeout(budget.as_millis() as u64)),
            };

            match outcome {
                Ok(items) if !items.is_empty() => {
                    debug!(
                        source = %source.key,
                        strategy = %label,
                        items = items.len(),
                        "strategy succeeded"
                    );
                    return Ok(FetchReport {
                        items,
                        strategy: label,
                        failures,
                    });
                }
                Ok(_) => {
                    debug!(source = %source.key, strategy = %label, "strategy returned no items");
                    failures.push(format!("Strategy {} ({label}): no items", i + 1));
                }
                Err(e) => {
                    warn!(source = %source.key, strategy = %label, error = %e, "strategy failed");
                    counter!("feed_strategy_failures_total", "strategy" => label.clone())
                        .increment(1);
                    if e.is_timeout() {
                        counter!("feed_strategy_timeouts_total", "strategy" => label.clone())
                            .increment(1);
                    }
                    failures.push(format!("Strategy {} ({label}): {e}", i + 1));
                }
            }
        }

        Err(FeedError::AllStrategiesFailed {
            source_key: source.key.clone(),
            reasons: failures,
        })
    }
}
