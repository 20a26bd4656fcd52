//! Feature resolution pipeline.
//!
//! ```text
//! request ─► validate ─► cache ─(miss)─► open ─► read_table ─► assemble ─► serialize ─► cache
//!                          │
//!                          └─(hit)─► cached bytes
//! ```
//!
//! On a miss the work runs on its own task, so a client that goes away
//! does not cancel it and the result still lands in the cache.

use std::sync::Arc;
use std::time::Instant;

use bundle_reader::{read_table, validate_source, BundleReference};
use bytes::Bytes;
use feature_protocol::{Assembly, FeatureError};
use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

use crate::limits::effective_limit;
use crate::response_cache::CacheKey;
use crate::state::AppState;

/// A validated feature request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    pub reference: BundleReference,
    /// Explicit table, `None` to resolve the default.
    pub table: Option<String>,
    /// Effective row limit.
    pub limit: u64,
}

impl FeatureRequest {
    /// Validate raw query parameters.
    ///
    /// A missing or empty `url` is an invalid request; a `url` that is not
    /// an absolute http(s) URL fails source validation. Nothing here
    /// performs I/O.
    pub fn parse(
        url: Option<&str>,
        table: Option<&str>,
        limit: Option<&str>,
        max_limit: u64,
    ) -> Result<Self, FeatureError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| FeatureError::InvalidRequest("Missing required parameter: url".to_string()))?;

        let reference = validate_source(url)?;
        let table = table
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            reference,
            table,
            limit: effective_limit(limit, max_limit),
        })
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.reference.as_str(), self.table.clone(), self.limit)
    }
}

/// Whether a response came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A serialized FeatureCollection and where it came from.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub body: Bytes,
    pub cache: CacheStatus,
}

/// Resolve a request to a serialized FeatureCollection.
pub async fn resolve(state: Arc<AppState>, request: FeatureRequest) -> Result<Resolution, FeatureError> {
    let key = request.cache_key();

    if let Some(body) = state.cache.get(&key).await {
        counter!("feature_cache_hits_total").increment(1);
        debug!(url = %request.reference, table = ?request.table, limit = request.limit, "Cache hit");
        return Ok(Resolution {
            body,
            cache: CacheStatus::Hit,
        });
    }
    counter!("feature_cache_misses_total").increment(1);

    let task = tokio::spawn(run(state, request, key));
    let result = task
        .await
        .map_err(|e| FeatureError::Internal(format!("resolution task failed: {}", e)))
        .and_then(|result| result);

    match result {
        Ok(body) => Ok(Resolution {
            body,
            cache: CacheStatus::Miss,
        }),
        Err(e) => {
            counter!("feature_upstream_errors_total", "kind" => e.kind()).increment(1);
            warn!(error = %e, kind = e.kind(), "Feature resolution failed");
            Err(e)
        }
    }
}

#[instrument(skip_all, fields(url = %request.reference, table = ?request.table, limit = request.limit))]
async fn run(state: Arc<AppState>, request: FeatureRequest, key: CacheKey) -> Result<Bytes, FeatureError> {
    let start = Instant::now();

    let store = state.opener.open(&request.reference).await?;
    let slice = read_table(
        store.as_ref(),
        &state.config.layout,
        request.table.as_deref(),
        request.limit,
    )
    .await?;

    let assembly = Assembly::run(&slice.column_names(), &slice.values, &state.config.geometry);
    counter!("feature_rows_dropped_total").increment(assembly.rows_dropped as u64);

    let body = serde_json::to_vec(&assembly.collection)
        .map(Bytes::from)
        .map_err(|e| FeatureError::Internal(format!("failed to serialize features: {}", e)))?;

    state.cache.put(key, body.clone()).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!("feature_resolve_duration_ms").record(elapsed_ms);
    info!(
        table = %slice.table,
        features = assembly.collection.len(),
        rows_read = assembly.rows_read,
        rows_dropped = assembly.rows_dropped,
        bytes = body.len(),
        elapsed_ms,
        "Resolved features"
    );

    Ok(body)
}
