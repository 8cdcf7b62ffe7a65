//! Validate, render, extract: the request path shared by the HTTP API and the CLI.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, instrument};
use url::Url;

use crate::allowlist::AllowList;
use crate::device::DeviceProfile;
use crate::extract::{Extraction, Pipeline};
use crate::render::{PageRenderer, RenderError};
use crate::validate::{validate_request, validate_url, ValidationError};

/// Everything needed to turn a page URL into a video URL.
#[derive(Clone)]
pub struct VideoService {
    renderer: Arc<dyn PageRenderer>,
    pipeline: Pipeline,
    device: DeviceProfile,
    allow: AllowList,
}

impl VideoService {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        pipeline: Pipeline,
        device: DeviceProfile,
        allow: AllowList,
    ) -> Self {
        Self {
            renderer,
            pipeline,
            device,
            allow,
        }
    }

    pub fn renderer(&self) -> &Arc<dyn PageRenderer> {
        &self.renderer
    }

    /// Validate a request body's `url` field.
    pub fn validate_body(&self, body: Option<&Value>) -> Result<Url, ValidationError> {
        validate_request(body, &self.allow)
    }

    /// Validate a raw URL string.
    pub fn validate(&self, raw: &str) -> Result<Url, ValidationError> {
        validate_url(raw, &self.allow)
    }

    /// Render `url` and run the extraction pipeline over the snapshot.
    ///
    /// `Ok` carries both found and not-found outcomes; only rendering
    /// failures are errors.
    #[instrument(skip(self), fields(url = %url, renderer = self.renderer.name()))]
    pub async fn resolve(&self, url: &Url) -> Result<Extraction, RenderError> {
        let started = Instant::now();
        let doc = self.renderer.render(url, &self.device).await?;
        let extraction = self.pipeline.run(&doc);

        info!(
            found = extraction.result.found,
            method = extraction.selected.map(|m| m.key()),
            elapsed_ms = started.elapsed().as_millis(),
            "Extraction finished"
        );
        Ok(extraction)
    }
}
