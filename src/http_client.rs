//! HTTP client for fetching target pages as an emulated device.
//!
//! Features:
//! - Device-profile headers (user agent, client hints, accept-language)
//! - Brotli and gzip compression (auto-negotiated)
//! - Cookie store, so consent redirects that set cookies resolve
//! - Bounded redirects and a hard request timeout

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use crate::device::DeviceProfile;

/// A fetched page: final URL after redirects plus the decoded body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub html: String,
}

/// HTTP client bound to one device profile.
pub struct PageClient {
    client: Client,
}

impl PageClient {
    /// Build a client that presents as `profile` and gives up after `timeout`.
    pub fn new(profile: &DeviceProfile, timeout: Duration) -> Result<Self> {
        let headers = profile
            .to_headers()
            .with_context(|| format!("device profile '{}' has invalid headers", profile.name))?;

        let client = Client::builder()
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch a page and return its body, failing on non-success status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchedPage> {
        debug!("Fetching page");
        let response = self.client.get(url.clone()).send().await?;

        info!(
            status = %response.status(),
            version = ?response.version(),
            final_url = %response.url(),
            "Response received"
        );

        let response = response.error_for_status()?;
        let final_url = response.url().clone();
        let html = response.text().await?;

        Ok(FetchedPage {
            url: final_url,
            html,
        })
    }
}
