//! Page rendering.
//!
//! A [`PageRenderer`] turns a target URL into a [`RenderedDocument`]: the
//! markup after scripts ran plus a JSON snapshot of the page's global state
//! containers. The extraction pipeline only ever sees that snapshot.
//!
//! # Architecture
//!
//! - [`ChromeRenderer`]: headless Chromium over CDP, one shared browser
//! - [`ScriptRenderer`]: plain HTTP fetch plus inline scripts in `QuickJS`
//! - [`RendererKind`]: config/CLI selector for the two

mod chrome;
mod script;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

pub use chrome::ChromeRenderer;
pub use script::ScriptRenderer;

use crate::device::DeviceProfile;
use crate::document::{RenderedDocument, STATE_CONTAINERS};

/// Marker written in place of a reference the snapshot has already seen.
pub const CYCLE_MARKER: &str = "[Circular]";

/// Marker written in place of anything nested deeper than [`SNAPSHOT_MAX_DEPTH`].
pub const TRUNCATED_MARKER: &str = "[Truncated]";

/// Nesting levels kept per state container. Stays below serde_json's parse limit.
pub const SNAPSHOT_MAX_DEPTH: usize = 100;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to snapshot page: {0}")]
    Snapshot(String),

    #[error("failed to fetch page: {0}")]
    Fetch(String),

    #[error("script engine failed: {0}")]
    Script(String),
}

/// Renders a page as a given device.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renderer name for logs (e.g. "chrome").
    fn name(&self) -> &'static str;

    /// Load `url` as `profile` and return the settled snapshot.
    async fn render(
        &self,
        url: &Url,
        profile: &DeviceProfile,
    ) -> Result<RenderedDocument, RenderError>;

    /// Release long-lived resources. Called once on server exit.
    async fn shutdown(&self) {}
}

/// Timing knobs shared by all renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Hard limit for navigation (or fetch plus script execution).
    pub navigation_timeout: Duration,
    /// Fixed delay after load so late scripts can populate the DOM.
    pub settle: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(30_000),
            settle: Duration::from_millis(1_500),
        }
    }
}

/// Which renderer backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chromium.
    #[default]
    Chrome,
    /// HTTP fetch plus embedded `QuickJS`; no browser needed.
    Script,
}

impl std::str::FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Self::Chrome),
            "script" | "quickjs" => Ok(Self::Script),
            other => Err(format!("unknown renderer '{other}' (expected chrome or script)")),
        }
    }
}

/// Build the configured renderer.
pub fn build_renderer(
    kind: RendererKind,
    options: RenderOptions,
    chrome_path: Option<PathBuf>,
) -> Arc<dyn PageRenderer> {
    match kind {
        RendererKind::Chrome => Arc::new(ChromeRenderer::new(options, chrome_path)),
        RendererKind::Script => Arc::new(ScriptRenderer::new(options)),
    }
}

/// JavaScript expression that serializes the state containers present on the page.
///
/// Evaluates to a JSON string `{"globals": {name: json, ..}, "failed": [..]}`
/// where every container is its own JSON string. Objects reached a second
/// time become [`CYCLE_MARKER`] and anything below [`SNAPSHOT_MAX_DEPTH`]
/// levels becomes [`TRUNCATED_MARKER`], so neither cycles nor deep state fail
/// the snapshot. Falsy containers are skipped.
pub fn state_snapshot_script() -> String {
    let names = serde_json::to_string(STATE_CONTAINERS).unwrap_or_else(|_| "[]".to_string());
    format!(
        r"(() => {{
            const maxDepth = {SNAPSHOT_MAX_DEPTH};
            const globals = {{}};
            const failed = [];
            for (const name of {names}) {{
                let value;
                try {{ value = globalThis[name]; }} catch (e) {{ failed.push(name + ': ' + e); continue; }}
                if (!value) continue;
                const seen = new WeakSet();
                const copy = (v, depth) => {{
                    if (v !== null && typeof v === 'object' && typeof v.toJSON === 'function') v = v.toJSON();
                    if (typeof v === 'bigint') return String(v);
                    if (v === null || typeof v !== 'object') return v;
                    if (seen.has(v)) return '{CYCLE_MARKER}';
                    if (depth >= maxDepth) return '{TRUNCATED_MARKER}';
                    seen.add(v);
                    if (Array.isArray(v)) return v.map(item => copy(item, depth + 1));
                    const out = {{}};
                    for (const key of Object.keys(v)) out[key] = copy(v[key], depth + 1);
                    return out;
                }};
                try {{
                    const json = JSON.stringify(copy(value, 0));
                    if (json !== undefined) globals[name] = json;
                }} catch (e) {{
                    failed.push(name + ': ' + e);
                }}
            }}
            return JSON.stringify({{ globals, failed }});
        }})()"
    )
}

/// Decode the output of [`state_snapshot_script`].
///
/// Containers are decoded one by one; one that cannot be read is left out
/// and named in the returned message, which feeds the result's `error` field.
pub fn parse_state_snapshot(raw: &str) -> (Map<String, Value>, Option<String>) {
    #[derive(Deserialize)]
    struct Snapshot {
        #[serde(default)]
        globals: Map<String, Value>,
        #[serde(default)]
        failed: Vec<String>,
    }

    let snapshot = match serde_json::from_str::<Snapshot>(raw) {
        Ok(snapshot) => snapshot,
        Err(e) => return (Map::new(), Some(format!("state snapshot unreadable: {e}"))),
    };

    let mut failed = snapshot.failed;
    let mut globals = Map::new();
    for (name, encoded) in snapshot.globals {
        let Value::String(text) = encoded else {
            globals.insert(name, encoded);
            continue;
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                globals.insert(name, value);
            }
            Err(e) => failed.push(format!("{name}: unreadable ({e})")),
        }
    }

    if failed.is_empty() {
        (globals, None)
    } else {
        (globals, Some(format!("state snapshot failed: {}", failed.join("; "))))
    }
}
