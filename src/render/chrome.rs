//! Headless Chromium renderer (chromiumoxide).
//!
//! One browser process is launched lazily on the first request and shared;
//! every request gets its own page, closed by [`PageGuard`] on every path.

use std::ops::Deref;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams, SetUserAgentOverrideParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Map;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{parse_state_snapshot, state_snapshot_script, PageRenderer, RenderError, RenderOptions};
use crate::device::DeviceProfile;
use crate::document::RenderedDocument;

/// Resource count must stay unchanged this long to count as network idle.
const NETWORK_IDLE_MS: u64 = 500;

struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

pub struct ChromeRenderer {
    options: RenderOptions,
    chrome_path: Option<PathBuf>,
    session: Mutex<Option<Session>>,
}

impl ChromeRenderer {
    pub fn new(options: RenderOptions, chrome_path: Option<PathBuf>) -> Self {
        Self {
            options,
            chrome_path,
            session: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<Session, RenderError> {
        info!("Launching headless browser");

        let mut builder = BrowserConfig::builder()
            .window_size(1280, 800)
            .request_timeout(self.options.navigation_timeout)
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--mute-audio");

        if let Some(ref path) = self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(RenderError::Launch)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {e}");
                }
            }
        });

        info!("Headless browser ready");
        Ok(Session { browser, handler })
    }

    /// Open a blank page, launching the browser first if needed.
    ///
    /// A failure on an existing browser drops it so the next request relaunches.
    async fn open_page(&self) -> Result<Page, RenderError> {
        let mut session = self.session.lock().await;

        if session.is_none() {
            *session = Some(self.launch().await?);
        }

        let opened = match session.as_ref() {
            Some(active) => active.browser.new_page("about:blank").await,
            None => return Err(RenderError::Launch("browser session unavailable".into())),
        };

        match opened {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!("Browser did not open a page, discarding it: {e}");
                if let Some(dead) = session.take() {
                    dead.handler.abort();
                }
                Err(RenderError::Launch(e.to_string()))
            }
        }
    }

    async fn emulate(page: &Page, profile: &DeviceProfile) -> Result<(), RenderError> {
        let nav = |e: chromiumoxide::error::CdpError| RenderError::Navigation(e.to_string());

        let mut agent = SetUserAgentOverrideParams::new(profile.user_agent.clone());
        agent.accept_language = Some(profile.accept_language.clone());
        page.execute(agent).await.map_err(nav)?;

        let viewport = profile.viewport;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            viewport.scale,
            profile.mobile,
        ))
        .await
        .map_err(nav)?;

        if profile.mobile {
            page.execute(SetTouchEmulationEnabledParams::new(true))
                .await
                .map_err(nav)?;
        }

        Ok(())
    }

    async fn snapshot(page: &Page, requested: &Url) -> Result<RenderedDocument, RenderError> {
        let html = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| RenderError::Snapshot(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| RenderError::Snapshot(e.to_string()))?;

        let (globals, snapshot_error) = match page.evaluate(state_snapshot_script()).await {
            Ok(value) => match value.into_value::<String>() {
                Ok(raw) => parse_state_snapshot(&raw),
                Err(e) => (Map::new(), Some(format!("state snapshot unreadable: {e}"))),
            },
            Err(e) => (Map::new(), Some(format!("state snapshot failed: {e}"))),
        };

        let url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| requested.to_string());

        Ok(RenderedDocument {
            url,
            html,
            globals,
            snapshot_error,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    fn name(&self) -> &'static str {
        "chrome"
    }

    #[instrument(skip(self, profile), fields(url = %url, device = %profile.name))]
    async fn render(
        &self,
        url: &Url,
        profile: &DeviceProfile,
    ) -> Result<RenderedDocument, RenderError> {
        let started = Instant::now();
        let page = PageGuard::new(self.open_page().await?);

        Self::emulate(&page, profile).await?;

        let limit = self.options.navigation_timeout;
        match tokio::time::timeout(limit, page.goto(url.as_str())).await {
            Err(_) => return Err(RenderError::Timeout(limit)),
            Ok(Err(e)) => return Err(RenderError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }

        let remaining = limit.saturating_sub(started.elapsed());
        wait_for_network_idle(&page, remaining).await;
        tokio::time::sleep(self.options.settle).await;

        let doc = Self::snapshot(&page, url).await?;
        debug!(
            html_bytes = doc.html.len(),
            containers = doc.globals.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Page rendered"
        );
        Ok(doc)
    }

    async fn shutdown(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };

        info!("Closing headless browser");
        if let Err(e) = session.browser.close().await {
            warn!("Browser did not close cleanly: {e}");
        }
        if let Err(e) = session.browser.wait().await {
            debug!("Browser wait failed: {e}");
        }
        session.handler.abort();
    }
}

/// Closes its page when dropped, on success and error paths alike.
struct PageGuard {
    page: Page,
    runtime: tokio::runtime::Handle,
}

impl PageGuard {
    fn new(page: Page) -> Self {
        Self {
            page,
            runtime: tokio::runtime::Handle::current(),
        }
    }
}

impl Deref for PageGuard {
    type Target = Page;

    fn deref(&self) -> &Page {
        &self.page
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        let page = self.page.clone();
        self.runtime.spawn(async move {
            if let Err(e) = page.close().await {
                debug!("Page close failed: {e}");
            }
        });
    }
}

/// Wait until the page's resource count stops changing, up to `timeout`.
///
/// chromiumoxide has no network-idle event, so this polls the Performance API.
async fn wait_for_network_idle(page: &Page, timeout: Duration) {
    let js = network_idle_script(timeout);

    match page.evaluate(js).await {
        Ok(value) => {
            if let Ok(info) = value.into_value::<serde_json::Value>() {
                let ok = info.get("ok").and_then(serde_json::Value::as_bool).unwrap_or(false);
                let waited = info.get("waitedMs").and_then(serde_json::Value::as_u64).unwrap_or(0);
                let resources = info
                    .get("resourceCount")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(0);
                if ok {
                    debug!(resources, waited_ms = waited, "Network idle");
                } else {
                    warn!(resources, waited_ms = waited, "Network never went idle");
                }
            }
        }
        Err(e) => warn!("Network idle check failed: {e}"),
    }
}

fn network_idle_script(timeout: Duration) -> String {
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    format!(
        r"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = {NETWORK_IDLE_MS};
            const interval = 100;
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};

            const start = Date.now();
            let last = count();
            let stable = 0;

            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const cur = count();
                if (document.readyState === 'complete' && cur === last) {{
                    stable += interval;
                    if (stable >= idleMs) {{
                        return {{ ok: true, resourceCount: cur, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    stable = 0;
                }}
                last = cur;
            }}

            return {{ ok: false, resourceCount: last, waitedMs: Date.now() - start }};
        }})()"
    )
}
