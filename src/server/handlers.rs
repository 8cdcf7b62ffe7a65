//! Request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::extract::{Extraction, ExtractionResult};

/// Successful `/api/fetch` response.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    pub video_url: String,
    pub filename: String,
    pub debug: ExtractionResult,
}

impl TryFrom<Extraction> for FetchResponse {
    type Error = ApiError;

    /// A pipeline run without a resolved URL is a not-found, trace attached.
    fn try_from(extraction: Extraction) -> Result<Self, ApiError> {
        let filename = extraction.filename();
        match (extraction.video_url, filename) {
            (Some(video_url), Some(filename)) => Ok(Self {
                video_url,
                filename,
                debug: extraction.result,
            }),
            _ => Err(ApiError::NotFound(extraction.result)),
        }
    }
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Resolve a page URL to a direct video URL.
///
/// Body problems other than size are reported as a missing `url`.
#[instrument(skip_all)]
pub async fn fetch_video(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<FetchResponse>> {
    let body = match body {
        Ok(Json(value)) => Some(value),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ApiError::PayloadTooLarge);
        }
        Err(rejection) => {
            debug!("Unusable request body: {rejection}");
            None
        }
    };

    let url = state.service.validate_body(body.as_ref())?;
    let extraction = state.service.resolve(&url).await?;

    FetchResponse::try_from(extraction).map(Json)
}
