// src/feeds/aggregate.rs
//! Fan-out over the whole registry plus the merged timeline view.

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::feeds::fetcher::ResilientFetcher;
use crate::feeds::types::{AggregateFeedResult, FeedItem, Source, SourceFetchResult};

#[derive(Clone)]
pub struct FanOutAggregator {
    fetcher: Arc<ResilientFetcher>,
}

impl FanOutAggregator {
    pub fn new(fetcher: Arc<ResilientFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &Arc<ResilientFetcher> {
        &self.fetcher
    }

    /// One task per source, all in flight at once. Never fails: a source
    /// that cannot be fetched is reported as `success: false`. Results come
    /// back in registry order regardless of completion order.
    pub async fn fetch_all(&self) -> AggregateFeedResult {
        crate::feeds::ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let handles: Vec<_> = self
            .fetcher
            .registry()
            .iter()
            .map(|source| {
                let fetcher = self.fetcher.clone();
                let source = source.clone();
                let key = source.key.clone();
                (key, tokio::spawn(async move { fetch_one(&fetcher, &source).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            let r = match handle.await {
                Ok(r) => r,
                Err(e) => {
                    warn!(source = %key, error = %e, "fetch task aborted");
                    SourceFetchResult::failed(&key, format!("fetch task failed: {e}"), Utc::now())
                }
            };
            results.push(r);
        }

        let agg = AggregateFeedResult::from_results(results, Utc::now());
        histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        info!(
            success = agg.success_count,
            total = agg.total_count,
            "feed fan-out finished"
        );
        agg
    }
}

async fn fetch_one(fetcher: &ResilientFetcher, source: &Source) -> SourceFetchResult {
    match fetcher.fetch(source).await {
        Ok(items) => SourceFetchResult::ok(&source.key, items, Utc::now()),
        Err(e) => {
            warn!(source = %source.key, error = %e, "source failed");
            counter!("feed_source_failures_total").increment(1);
            SourceFetchResult::failed(&source.key, e.to_string(), Utc::now())
        }
    }
}

/// Item in the merged view, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub source_key: String,
    #[serde(flatten)]
    pub item: FeedItem,
}

impl AggregateFeedResult {
    /// Items of all successful sources, newest first, without duplicates
    /// (by link, else unique id) and without anything older than `max_age`.
    pub fn timeline(
        &self,
        limit: usize,
        max_age: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Vec<TimelineItem> {
        let cutoff = max_age.map(|age| now - age);
        let mut seen = HashSet::new();
        let mut out: Vec<TimelineItem> = self
            .results
            .iter()
            .filter(|r| r.success)
            .flat_map(|r| r.items.iter().map(move |it| (r.source_key.as_str(), it)))
            .filter(|(_, it)| cutoff.map_or(true, |c| it.published_at >= c))
            .filter(|(_, it)| {
                let key = if it.link.is_empty() {
                    it.unique_id.clone()
                } else {
                    it.link.clone()
                };
                seen.insert(key)
            })
            .map(|(source_key, it)| TimelineItem {
                source_key: source_key.to_string(),
                item: it.clone(),
            })
            .collect();

        out.sort_by(|a, b| b.item.published_at.cmp(&a.item.published_at));
        out.truncate(limit);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(link: &str, at: DateTime<Utc>) -> FeedItem {
        FeedItem {
            title: link.to_string(),
            link: link.to_string(),
            description: String::new(),
            published_at: at,
            unique_id: link.to_string(),
            author: None,
        }
    }

    #[test]
    fn timeline_merges_sorts_dedups_and_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let h = |n: i64| now - Duration::hours(n);
        let agg = AggregateFeedResult::from_results(
            vec![
                SourceFetchResult::ok("a", vec![item("http://1", h(5)), item("http://2", h(1))], now),
                SourceFetchResult::failed("b", "down".into(), now),
                SourceFetchResult::ok("c", vec![item("http://2", h(2)), item("http://old", h(100))], now),
            ],
            now,
        );

        let tl = agg.timeline(10, Some(Duration::hours(48)), now);
        let links: Vec<&str> = tl.iter().map(|t| t.item.link.as_str()).collect();
        assert_eq!(links, ["http://2", "http://1"]);
        assert_eq!(tl[0].source_key, "a");

        assert_eq!(agg.timeline(1, None, now).len(), 1);
        assert_eq!(agg.timeline(10, None, now).len(), 3);
    }
}
