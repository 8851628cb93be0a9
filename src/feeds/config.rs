// src/feeds/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feeds::cache::CACHE_TTL_SECS;
use crate::feeds::registry::SourceRegistry;
use crate::feeds::strategy::DEFAULT_STRATEGY_TIMEOUT;
use crate::feeds::types::{Category, Source};

pub const ENV_SOURCES_PATH: &str = "FEED_SOURCES_PATH";
pub const ENV_CACHE_DIR: &str = "FEED_CACHE_DIR";
pub const ENV_STRATEGY_TIMEOUT_MS: &str = "FEED_STRATEGY_TIMEOUT_MS";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_REFRESH_SECS: &str = "FEED_REFRESH_SECS";

pub const DEFAULT_CACHE_DIR: &str = "cache/feeds";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Deserialize)]
struct SourceEntry {
    key: String,
    url: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl From<SourceEntry> for Source {
    fn from(e: SourceEntry) -> Self {
        Source {
            key: e.key.trim().to_string(),
            url: e.url.trim().to_string(),
            category: Category::parse(&e.category),
            description: e.description.trim().to_string(),
        }
    }
}

/// Load the registry from an explicit path. Supports TOML or JSON formats.
pub fn load_registry_from(path: &Path) -> Result<SourceRegistry> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing feed sources from {}", path.display()))
}

/// Load the registry using env var + fallbacks:
/// 1) $FEED_SOURCES_PATH
/// 2) config/feed_sources.toml
/// 3) config/feed_sources.json
/// 4) built-in defaults
pub fn load_registry_default() -> Result<SourceRegistry> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_registry_from(&pb);
        } else {
            return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feed_sources.toml");
    if toml_p.exists() {
        return load_registry_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feed_sources.json");
    if json_p.exists() {
        return load_registry_from(&json_p);
    }
    Ok(SourceRegistry::defaults())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourceRegistry> {
    let entries = if hint_ext == "toml" || s.contains("[[sources]]") {
        parse_toml(s)?
    } else if hint_ext == "json" || s.trim_start().starts_with('[') {
        parse_json(s)?
    } else {
        parse_json(s).or_else(|_| parse_toml(s))?
    };
    let sources = entries
        .into_iter()
        .filter(|e| e.enabled)
        .map(Source::from)
        .collect();
    SourceRegistry::new(sources)
}

fn parse_toml(s: &str) -> Result<Vec<SourceEntry>> {
    #[derive(Deserialize)]
    struct TomlSources {
        sources: Vec<SourceEntry>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(v.sources)
}

fn parse_json(s: &str) -> Result<Vec<SourceEntry>> {
    Ok(serde_json::from_str(s)?)
}

/// Runtime knobs read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub cache_dir: PathBuf,
    pub strategy_timeout: Duration,
    pub bind_addr: String,
    pub json_logs: bool,
    /// Background refresh period; `None` disables the scheduler.
    pub refresh_interval: Option<Duration>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            strategy_timeout: DEFAULT_STRATEGY_TIMEOUT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            json_logs: false,
            refresh_interval: Some(Duration::from_secs(CACHE_TTL_SECS as u64)),
        }
    }
}

impl FeedSettings {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            cache_dir: std::env::var(ENV_CACHE_DIR)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(d.cache_dir),
            strategy_timeout: parse_timeout_ms(std::env::var(ENV_STRATEGY_TIMEOUT_MS).ok())
                .unwrap_or(d.strategy_timeout),
            bind_addr: std::env::var(ENV_BIND_ADDR)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.bind_addr),
            json_logs: std::env::var(ENV_LOG_FORMAT)
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            refresh_interval: match std::env::var(ENV_REFRESH_SECS) {
                Ok(v) => parse_refresh_secs(&v),
                Err(_) => d.refresh_interval,
            },
        }
    }
}

// parse optional millis env; zero or garbage means "use the default"
fn parse_timeout_ms(raw: Option<String>) -> Option<Duration> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

// "0" turns the scheduler off; garbage does too rather than guessing
fn parse_refresh_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
}
