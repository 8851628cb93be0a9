// Shared test doubles for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use learning_feeds::feeds::cache::KvStore;
use learning_feeds::feeds::error::{CacheError, FeedError};
use learning_feeds::feeds::strategy::FetchStrategy;
use learning_feeds::feeds::transport::{HttpResponse, HttpTransport};
use learning_feeds::{Category, FeedItem, Source, SourceRegistry};

pub const HN_RSS: &str = include_str!("../fixtures/hn_rss.xml");
pub const REDDIT_ATOM: &str = include_str!("../fixtures/reddit_atom.xml");
pub const ARXIV_RDF: &str = include_str!("../fixtures/arxiv_rdf.xml");
pub const ARXIV_ATOM: &str = include_str!("../fixtures/arxiv_atom.xml");
pub const RSS2JSON: &str = include_str!("../fixtures/rss2json.json");
pub const SERVERLESS: &str = include_str!("../fixtures/serverless.json");

/// Deterministic item; later `n` is one minute newer.
pub fn item(n: usize) -> FeedItem {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    FeedItem {
        title: format!("item {n}"),
        link: format!("https://example.test/{n}"),
        description: String::new(),
        published_at: base + ChronoDuration::minutes(n as i64),
        unique_id: format!("https://example.test/{n}"),
        author: None,
    }
}

/// What a scripted strategy does when attempted.
#[derive(Clone)]
pub enum Script {
    Items(usize),
    Empty,
    Fail(&'static str),
    Hang,
}

/// Strategy that follows a fixed script and counts its calls.
pub struct ScriptedStrategy {
    label: String,
    script: Script,
    timeout: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedStrategy {
    pub fn new(label: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            script,
            timeout: Duration::from_secs(8),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn hanging(label: &str, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            script: Script::Hang,
            timeout,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchStrategy for ScriptedStrategy {
    fn label(&self) -> &str {
        &self.label
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, _source: &Source) -> Result<Vec<FeedItem>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Items(n) => Ok((0..*n).map(item).collect()),
            Script::Empty => Ok(Vec::new()),
            Script::Fail(msg) => Err(FeedError::Transport(msg.to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![item(0)])
            }
        }
    }
}

/// One canned reply, optionally delayed.
#[derive(Clone)]
pub struct Route {
    pub delay: Duration,
    pub reply: Result<HttpResponse, FeedError>,
}

impl Route {
    pub fn ok(body: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(HttpResponse::ok(body)),
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(HttpResponse {
                status: code,
                body: String::new(),
            }),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Transport answering from a URL → route table; unknown URLs fail.
#[derive(Default)]
pub struct MapTransport {
    routes: HashMap<String, Route>,
    pub log: Mutex<Vec<String>>,
}

impl MapTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, route: Route) -> Self {
        self.routes.insert(url.to_string(), route);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MapTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, FeedError> {
        self.log.lock().unwrap().push(url.to_string());
        let Some(route) = self.routes.get(url).cloned() else {
            return Err(FeedError::Transport(format!("connection refused: {url}")));
        };
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        route.reply
    }
}

pub fn registry(entries: &[(&str, Category)]) -> SourceRegistry {
    SourceRegistry::new(
        entries
            .iter()
            .map(|(key, cat)| {
                let url = format!("https://feeds.test/{}", key.replace(' ', "-"));
                Source::new(key, &url, *cat, "")
            })
            .collect(),
    )
    .unwrap()
}

pub fn url_of(key: &str) -> String {
    format!("https://feeds.test/{}", key.replace(' ', "-"))
}

/// Store whose every operation fails, like a full disk or a read-only dir.
#[derive(Default)]
pub struct BrokenStore {
    pub attempts: AtomicUsize,
}

impl BrokenStore {
    fn fail(&self) -> CacheError {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        CacheError::Storage(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only cache dir",
        ))
    }
}

impl KvStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(self.fail())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
        Err(self.fail())
    }

    fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(self.fail())
    }
}
