//! Request-level error types.
//!
//! Row-level geometry failures are not represented here: they are recovered
//! inside the assembler and never reach the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a feature request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    /// Missing or malformed request parameters.
    #[error("{0}")]
    InvalidRequest(String),

    /// HTTP method other than GET.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Disallowed URL scheme or unparsable URL.
    #[error("Invalid source URL: {0}")]
    SourceValidation(String),

    /// Missing tables root, empty table, or no columns.
    #[error("Invalid bundle structure: {0}")]
    BundleStructure(String),

    /// Network failure or malformed remote store metadata.
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// Failure inside this service (serialization, task join).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeatureError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            FeatureError::InvalidRequest(_) => 400,
            FeatureError::MethodNotAllowed(_) => 405,
            FeatureError::SourceValidation(_) => 500,
            FeatureError::BundleStructure(_) => 500,
            FeatureError::UpstreamFetch(_) => 500,
            FeatureError::Internal(_) => 500,
        }
    }

    /// Short machine-readable category, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureError::InvalidRequest(_) => "invalid_request",
            FeatureError::MethodNotAllowed(_) => "method_not_allowed",
            FeatureError::SourceValidation(_) => "source_validation",
            FeatureError::BundleStructure(_) => "bundle_structure",
            FeatureError::UpstreamFetch(_) => "upstream_fetch",
            FeatureError::Internal(_) => "internal",
        }
    }

    /// Convert to the JSON error body.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

/// JSON body of every error response: `{ "error": message }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}
