//! Service configuration loading and types.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bundle_reader::BundleLayout;
use feature_protocol::GeometryFields;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `limits.max_limit`.
pub const MAX_LIMIT_ENV: &str = "FEATURE_API_MAX_LIMIT";

/// Environment variable overriding `cache.ttl_secs`.
pub const CACHE_TTL_ENV: &str = "FEATURE_API_CACHE_TTL_SECS";

/// Feature API configuration, loaded from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureApiConfig {
    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Where tables and columns live inside a bundle.
    #[serde(default)]
    pub layout: BundleLayout,

    /// Columns geometry is derived from.
    #[serde(default)]
    pub geometry: GeometryFields,
}

/// Per-request work bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsConfig {
    /// Maximum rows read per request.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
        }
    }
}

fn default_max_limit() -> u64 {
    2000
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Freshness window in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached responses.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Maximum total size of cached responses in megabytes.
    #[serde(default = "default_max_mb")]
    pub max_mb: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            max_mb: default_max_mb(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    60
}

fn default_max_entries() -> usize {
    512
}

fn default_max_mb() -> usize {
    256
}

/// Settings for calls to bundle hosts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Timeout for each HTTP call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FeatureApiConfig {
    /// Load configuration from a YAML file, applying environment overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read: {:?}", path))?;
            let config: Self = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse: {:?}", path))?;
            tracing::info!("Loaded feature API config from {:?}", path);
            config
        } else {
            tracing::warn!("Config file {:?} does not exist, using defaults", path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(MAX_LIMIT_ENV) {
            self.limits.max_limit = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer, got '{}'", MAX_LIMIT_ENV, raw))?;
        }

        if let Some(raw) = lookup(CACHE_TTL_ENV) {
            self.cache.ttl_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer, got '{}'", CACHE_TTL_ENV, raw))?;
        }

        Ok(())
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_limit == 0 {
            bail!("limits.max_limit must be at least 1");
        }
        if self.cache.max_entries == 0 {
            bail!("cache.max_entries must be at least 1");
        }
        if self.geometry.x_field == self.geometry.y_field {
            bail!(
                "geometry.x_field and geometry.y_field must differ (both '{}')",
                self.geometry.x_field
            );
        }
        Ok(())
    }
}
