// src/feeds/transport.rs
use async_trait::async_trait;
use std::time::Duration;

use crate::feeds::error::FeedError;

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP surface the fetch strategies need.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, FeedError>;
}

/// `reqwest`-backed transport used in production.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("learning-feeds/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, FeedError> {
        let resp = self.client.get(url).timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout(timeout.as_millis() as u64)
            } else {
                FeedError::Transport(e.to_string())
            }
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}
