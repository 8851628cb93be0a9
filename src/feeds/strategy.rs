// src/feeds/strategy.rs
//! Retrieval strategies: one way each of turning a [`Source`] into items.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::feeds::error::FeedError;
use crate::feeds::normalize::normalize;
use crate::feeds::payload::{PayloadShape, RawPayload};
use crate::feeds::transport::HttpTransport;
use crate::feeds::types::{FeedItem, Source};

pub const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(8);

#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Short name used in logs and failure reasons.
    fn label(&self) -> &str;

    /// Budget for one attempt; the fetcher cancels the attempt past it.
    fn timeout(&self) -> Duration {
        DEFAULT_STRATEGY_TIMEOUT
    }

    async fn attempt(&self, source: &Source) -> Result<Vec<FeedItem>, FeedError>;
}

pub type SharedStrategy = Arc<dyn FetchStrategy>;

/// Where a [`ProxyStrategy`] sends its GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `base?param=<url-encoded source url>`
    Proxy { base: String, param: String },
    /// The source URL itself.
    Direct,
}

/// GET through a proxy (or directly), check status, decode the declared
/// shape, normalize.
pub struct ProxyStrategy {
    label: String,
    endpoint: Endpoint,
    shape: PayloadShape,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
}

impl ProxyStrategy {
    pub fn new(
        label: &str,
        endpoint: Endpoint,
        shape: PayloadShape,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            label: label.to_string(),
            endpoint,
            shape,
            timeout: DEFAULT_STRATEGY_TIMEOUT,
            transport,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn request_url(&self, source: &Source) -> Result<String, FeedError> {
        match &self.endpoint {
            Endpoint::Direct => Ok(source.url.clone()),
            Endpoint::Proxy { base, param } => {
                reqwest::Url::parse_with_params(base, &[(param.as_str(), source.url.as_str())])
                    .map(String::from)
                    .map_err(|e| FeedError::Transport(format!("bad proxy url {base}: {e}")))
            }
        }
    }
}

#[async_trait]
impl FetchStrategy for ProxyStrategy {
    fn label(&self) -> &str {
        &self.label
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, source: &Source) -> Result<Vec<FeedItem>, FeedError> {
        let url = self.request_url(source)?;
        let resp = self.transport.get(&url, self.timeout).await?;
        if !resp.is_success() {
            return Err(FeedError::Transport(format!("HTTP {}", resp.status)));
        }
        let payload = RawPayload::decode(self.shape, &resp.body)?;
        normalize(&payload, &source.key)
    }
}

/// The deployment's ordered strategy list: specific JSON proxy first, then a
/// raw CORS relay, a second JSON proxy, and finally the source itself.
pub fn default_strategies(
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
) -> Vec<SharedStrategy> {
    let proxy = |base: &str, param: &str| Endpoint::Proxy {
        base: base.to_string(),
        param: param.to_string(),
    };
    vec![
        Arc::new(
            ProxyStrategy::new(
                "rss2json",
                proxy("https://api.rss2json.com/v1/api.json", "rss_url"),
                PayloadShape::Rss2Json,
                transport.clone(),
            )
            .with_timeout(timeout),
        ),
        Arc::new(
            ProxyStrategy::new(
                "allorigins",
                proxy("https://api.allorigins.win/raw", "url"),
                PayloadShape::RawXml,
                transport.clone(),
            )
            .with_timeout(timeout),
        ),
        Arc::new(
            ProxyStrategy::new(
                "rss-to-json-serverless",
                proxy("https://rss-to-json-serverless-api.vercel.app/api", "url"),
                PayloadShape::ItemsArray,
                transport.clone(),
            )
            .with_timeout(timeout),
        ),
        Arc::new(
            ProxyStrategy::new("direct", Endpoint::Direct, PayloadShape::RawXml, transport)
                .with_timeout(timeout),
        ),
    ]
}
