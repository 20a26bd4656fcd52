//! Response cache statistics handler.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::response_cache::CacheStatsSnapshot;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CacheStatsResponse {
    pub ttl_secs: u64,
    #[serde(flatten)]
    pub stats: CacheStatsSnapshot,
}

/// GET /api/cache/stats
pub async fn cache_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        ttl_secs: state.cache.ttl().as_secs(),
        stats: state.cache.stats().snapshot(),
    })
}
