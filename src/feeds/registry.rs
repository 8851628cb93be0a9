// src/feeds/registry.rs
use anyhow::{bail, Result};
use std::collections::HashSet;

use crate::feeds::types::{Category, Source};

/// Ordered, immutable set of sources. Iteration order is the order results
/// are reported in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// Keys must be unique and non-empty.
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        let mut seen = HashSet::new();
        for s in &sources {
            if s.key.trim().is_empty() {
                bail!("feed source with empty key (url: {})", s.url);
            }
            if s.url.trim().is_empty() {
                bail!("feed source {} has no url", s.key);
            }
            if !seen.insert(s.key.as_str()) {
                bail!("duplicate feed source key: {}", s.key);
            }
        }
        Ok(Self { sources })
    }

    /// Built-in AI/ML reading list.
    pub fn defaults() -> Self {
        Self {
            sources: vec![
                Source::new(
                    "HackerNews AI/ML",
                    "https://hnrss.org/newest?q=AI+OR+LLM+OR+GPT+OR+machine+learning+OR+artificial+intelligence",
                    Category::News,
                    "Latest AI/ML discussions from Hacker News",
                ),
                Source::new(
                    "ArXiv CS.AI",
                    "http://export.arxiv.org/rss/cs.AI",
                    Category::Research,
                    "Recent AI research papers from ArXiv",
                ),
                Source::new(
                    "ArXiv CS.LG",
                    "http://export.arxiv.org/rss/cs.LG",
                    Category::Research,
                    "Machine Learning papers from ArXiv",
                ),
                Source::new(
                    "Reddit r/MachineLearning",
                    "https://www.reddit.com/r/MachineLearning/.rss",
                    Category::Community,
                    "Machine Learning community discussions",
                ),
                Source::new(
                    "Reddit r/artificial",
                    "https://www.reddit.com/r/artificial/.rss",
                    Category::Community,
                    "General AI discussions and news",
                ),
            ],
        }
    }

    pub fn get(&self, key: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.key == key)
    }

    pub fn category_of(&self, key: &str) -> Category {
        self.get(key).map(|s| s.category).unwrap_or(Category::General)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
