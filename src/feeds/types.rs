// src/feeds/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed set of source categories. Anything unrecognised lands in `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    News,
    Research,
    Community,
    #[serde(other)]
    General,
}

impl Category {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Category::News,
            "research" => Category::Research,
            "community" => Category::Community,
            _ => Category::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::News => "news",
            Category::Research => "research",
            Category::Community => "community",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub key: String,
    pub url: String,
    pub category: Category,
    pub description: String,
}

impl Source {
    pub fn new(key: &str, url: &str, category: Category, description: &str) -> Self {
        Self {
            key: key.to_string(),
            url: url.to_string(),
            category,
            description: description.to_string(),
        }
    }
}

/// Canonical item shape produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Outcome of one resilient fetch for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFetchResult {
    pub source_key: String,
    pub items: Vec<FeedItem>,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl SourceFetchResult {
    pub fn ok(source_key: &str, items: Vec<FeedItem>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source_key: source_key.to_string(),
            items,
            success: true,
            error: None,
            fetched_at,
        }
    }

    pub fn failed(source_key: &str, error: String, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source_key: source_key.to_string(),
            items: Vec::new(),
            success: false,
            error: Some(error),
            fetched_at,
        }
    }
}

/// One fan-out pass over the whole registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFeedResult {
    pub results: Vec<SourceFetchResult>,
    pub timestamp: DateTime<Utc>,
    pub success_count: usize,
    pub total_count: usize,
}

impl AggregateFeedResult {
    /// Counts are always derived from `results`.
    pub fn from_results(results: Vec<SourceFetchResult>, timestamp: DateTime<Utc>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        let total_count = results.len();
        Self {
            results,
            timestamp,
            success_count,
            total_count,
        }
    }

    pub fn get(&self, source_key: &str) -> Option<&SourceFetchResult> {
        self.results.iter().find(|r| r.source_key == source_key)
    }
}

/// What the freshness cache stores: the aggregate plus the write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPayload {
    #[serde(flatten)]
    pub data: AggregateFeedResult,
    pub cached_at: DateTime<Utc>,
}
