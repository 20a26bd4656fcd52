//! Feature endpoint handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::{header, Method},
    response::{IntoResponse, Response},
};
use feature_protocol::{media_types, FeatureError};
use metrics::counter;
use serde::Deserialize;

use crate::error::ApiError;
use crate::pipeline::{self, FeatureRequest};
use crate::state::AppState;

/// Query parameters for the feature endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureQueryParams {
    /// Bundle URL. Required parameter.
    pub url: Option<String>,

    /// Table name, overriding default table resolution.
    pub table: Option<String>,

    /// Maximum number of rows, clamped to the configured maximum.
    pub limit: Option<String>,
}

/// GET /api/features
pub async fn features_handler(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<FeatureQueryParams>, QueryRejection>,
) -> Response {
    counter!("feature_requests_total").increment(1);

    let Query(params) = match query {
        Ok(query) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected feature query string");
            return ApiError(FeatureError::InvalidRequest(rejection.body_text())).into_response();
        }
    };

    let request = match FeatureRequest::parse(
        params.url.as_deref(),
        params.table.as_deref(),
        params.limit.as_deref(),
        state.config.limits.max_limit,
    ) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected feature request");
            return ApiError(e).into_response();
        }
    };

    match pipeline::resolve(state, request).await {
        Ok(resolution) => (
            [(header::CONTENT_TYPE, media_types::GEO_JSON)],
            [("x-cache", resolution.cache.as_str())],
            resolution.body,
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// Any method other than GET on /api/features, HEAD included
pub async fn method_not_allowed_handler(method: Method) -> Response {
    ApiError(FeatureError::MethodNotAllowed(method.to_string())).into_response()
}
