//! Error types for bundle access.

use feature_protocol::FeatureError;
use thiserror::Error;

/// Errors that can occur while validating, opening or reading a bundle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BundleError {
    /// The source string is not an acceptable bundle URL.
    #[error("{0}")]
    SourceValidation(String),

    /// The bundle is reachable but its layout is not usable.
    #[error("{0}")]
    Structure(String),

    /// Network failure or malformed store metadata.
    #[error("{0}")]
    Upstream(String),
}

impl BundleError {
    /// Create a SourceValidation error.
    pub fn source_validation(msg: impl Into<String>) -> Self {
        Self::SourceValidation(msg.into())
    }

    /// Create a Structure error.
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    /// Create an Upstream error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

impl From<object_store::Error> for BundleError {
    fn from(err: object_store::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for BundleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Upstream(format!("malformed store metadata: {}", err))
    }
}

impl From<BundleError> for FeatureError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::SourceValidation(msg) => FeatureError::SourceValidation(msg),
            BundleError::Structure(msg) => FeatureError::BundleStructure(msg),
            BundleError::Upstream(msg) => FeatureError::UpstreamFetch(msg),
        }
    }
}

/// Result type for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;
