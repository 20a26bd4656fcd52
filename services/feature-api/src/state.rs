//! Application state for the feature API.

use std::sync::Arc;
use std::time::Duration;

use bundle_reader::{BundleOpener, ClientConfig, HttpBundleOpener};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::FeatureApiConfig;
use crate::response_cache::ResponseCache;

/// Shared application state.
pub struct AppState {
    /// Service configuration.
    pub config: FeatureApiConfig,

    /// Opens bundles for validated references.
    pub opener: Arc<dyn BundleOpener>,

    /// Process-wide response cache.
    pub cache: ResponseCache,

    /// Prometheus renderer, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state that reads bundles over HTTP(S).
    pub fn new(config: FeatureApiConfig) -> Self {
        let opener = HttpBundleOpener::new(ClientConfig {
            timeout: config.upstream.timeout(),
        });
        Self::with_opener(config, Arc::new(opener))
    }

    /// Create state around an existing opener.
    pub fn with_opener(config: FeatureApiConfig, opener: Arc<dyn BundleOpener>) -> Self {
        let cache = ResponseCache::new(
            config.cache.max_entries,
            config.cache.max_mb,
            Duration::from_secs(config.cache.ttl_secs),
        );

        Self {
            config,
            opener,
            cache,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle rendered on `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
