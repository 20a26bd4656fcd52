//! Bundle source validation.
//!
//! Runs strictly before any I/O: only absolute `http`/`https` URLs with a
//! host are accepted, so local paths and other schemes never reach a
//! store.

use std::fmt;

use reqwest::Url;

use crate::error::{BundleError, Result};

/// A validated, absolute `http`/`https` bundle URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleReference {
    url: Url,
}

impl BundleReference {
    /// Validate a raw source string.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let url = Url::parse(raw).map_err(|e| {
            BundleError::source_validation(format!("'{}' is not an absolute URL: {}", raw, e))
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(BundleError::source_validation(format!(
                    "scheme '{}' is not allowed, expected http or https",
                    other
                )))
            }
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(BundleError::source_validation(format!(
                "'{}' has no host",
                raw
            )));
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for BundleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Validate a raw source string. See [`BundleReference::parse`].
pub fn validate_source(raw: &str) -> Result<BundleReference> {
    BundleReference::parse(raw)
}
