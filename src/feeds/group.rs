// src/feeds/group.rs
use serde::Serialize;
use std::collections::BTreeMap;

use crate::feeds::registry::SourceRegistry;
use crate::feeds::types::{AggregateFeedResult, Category, SourceFetchResult};

/// Static presentation metadata, one per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub color: &'static str,
    pub icon: &'static str,
    pub name: &'static str,
}

impl CategoryInfo {
    pub fn for_category(c: Category) -> Self {
        match c {
            Category::News => Self {
                color: "blue",
                icon: "📡",
                name: "News & Articles",
            },
            Category::Research => Self {
                color: "purple",
                icon: "🔬",
                name: "Research Papers",
            },
            Category::Community => Self {
                color: "green",
                icon: "💬",
                name: "Community Discussions",
            },
            Category::General => Self {
                color: "gray",
                icon: "📄",
                name: "General",
            },
        }
    }
}

/// One category's successful sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub category_info: CategoryInfo,
    pub sources: Vec<SourceFetchResult>,
}

pub type GroupedFeeds = BTreeMap<Category, CategoryGroup>;

/// Partition successful, non-empty sources by their registry category.
/// Failed or empty sources are left out entirely, and categories with no
/// surviving source are absent from the map.
pub fn group_by_category(result: &AggregateFeedResult, registry: &SourceRegistry) -> GroupedFeeds {
    let mut grouped = GroupedFeeds::new();
    for r in &result.results {
        if !r.success || r.items.is_empty() {
            continue;
        }
        let category = registry.category_of(&r.source_key);
        grouped
            .entry(category)
            .or_insert_with(|| CategoryGroup {
                category_info: CategoryInfo::for_category(category),
                sources: Vec::new(),
            })
            .sources
            .push(r.clone());
    }
    grouped
}
