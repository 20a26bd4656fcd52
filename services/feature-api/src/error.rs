//! HTTP mapping of request-level errors.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use feature_protocol::FeatureError;

/// A [`FeatureError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub FeatureError);

impl From<FeatureError> for ApiError {
    fn from(err: FeatureError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self.0.to_body());

        match self.0 {
            FeatureError::MethodNotAllowed(_) => {
                (status, [(header::ALLOW, "GET")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
