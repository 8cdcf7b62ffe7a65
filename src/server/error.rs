//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::extract::ExtractionResult;
use crate::render::RenderError;
use crate::validate::ValidationError;

pub type ApiResult<T> = Result<T, ApiError>;

pub const NOT_FOUND_MESSAGE: &str = "Video not found / private or blocked";
pub const RENDER_FAILED_MESSAGE: &str = "Server error fetching remote page";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("{}", NOT_FOUND_MESSAGE)]
    NotFound(ExtractionResult),

    #[error("{}", RENDER_FAILED_MESSAGE)]
    Render(#[from] RenderError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client.
    pub fn body(&self) -> Value {
        match self {
            ApiError::NotFound(debug) => json!({ "error": self.to_string(), "debug": debug }),
            ApiError::Render(e) => json!({ "error": self.to_string(), "detail": e.to_string() }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn validation_errors_are_bad_requests_with_message() {
        let err = ApiError::from(ValidationError::Missing);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), json!({"error": "No url provided"}));
    }

    #[test]
    fn not_found_carries_debug_trace() {
        let err = ApiError::NotFound(ExtractionResult::default());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            err.body(),
            json!({"error": NOT_FOUND_MESSAGE, "debug": {"found": false, "methods": {}}})
        );
    }

    #[test]
    fn render_failures_carry_detail() {
        let err = ApiError::from(RenderError::Timeout(Duration::from_secs(30)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.body();
        assert_eq!(body["error"], RENDER_FAILED_MESSAGE);
        assert_eq!(body["detail"], "navigation timed out after 30s");
    }
}
