use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::feeds::cache::CACHE_TTL_SECS;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Only one recorder may exist per
    /// process, so call this once from the binary.
    pub fn init() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        crate::feeds::ensure_metrics_described();

        // Static gauge with the cache TTL (fixed, evaluated lazily on read)
        gauge!("feed_cache_ttl_seconds").set(CACHE_TTL_SECS as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
