//! Browserless renderer: HTTP fetch plus inline scripts in `QuickJS`.
//!
//! Good enough for pages that ship their initial state inline, which is how
//! the state containers usually arrive. Anything that needs real layout,
//! network calls from scripts or timers will not render here.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    parse_state_snapshot, state_snapshot_script, PageRenderer, RenderError, RenderOptions,
    SNAPSHOT_MAX_DEPTH, TRUNCATED_MARKER,
};
use crate::device::DeviceProfile;
use crate::document::{is_truthy, RenderedDocument, STATE_CONTAINERS};
use crate::http_client::PageClient;
use crate::js_engine::JsEngine;

/// Script `type` values that are executed. Absent type means JavaScript.
const SCRIPT_TYPES: &[&str] = &["text/javascript", "application/javascript", "module"];

pub struct ScriptRenderer {
    options: RenderOptions,
}

impl ScriptRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageRenderer for ScriptRenderer {
    fn name(&self) -> &'static str {
        "script"
    }

    #[instrument(skip(self, profile), fields(url = %url, device = %profile.name))]
    async fn render(
        &self,
        url: &Url,
        profile: &DeviceProfile,
    ) -> Result<RenderedDocument, RenderError> {
        let started = Instant::now();
        let limit = self.options.navigation_timeout;

        let client =
            PageClient::new(profile, limit).map_err(|e| RenderError::Fetch(format!("{e:#}")))?;
        let page = match tokio::time::timeout(limit, client.fetch_page(url)).await {
            Err(_) => return Err(RenderError::Timeout(limit)),
            Ok(Err(e)) => return Err(RenderError::Fetch(format!("{e:#}"))),
            Ok(Ok(page)) => page,
        };

        let scripts = inline_scripts(&page.html);
        let budget = limit.saturating_sub(started.elapsed());
        let page_url = page.url.clone();
        let user_agent = profile.user_agent.clone();

        let (mut globals, snapshot_error) = tokio::task::spawn_blocking(move || {
            execute_scripts(&page_url, &user_agent, &scripts, budget)
        })
        .await
        .map_err(|e| RenderError::Script(e.to_string()))??;

        for name in STATE_CONTAINERS {
            if globals.get(*name).is_some_and(is_truthy) {
                continue;
            }
            if let Some(value) = extract_assigned_json(&page.html, name) {
                debug!(container = name, "State container recovered from markup");
                globals.insert((*name).to_string(), value);
            }
        }

        Ok(RenderedDocument {
            url: page.url.to_string(),
            html: page.html,
            globals,
            snapshot_error,
        })
    }
}

/// Bodies of the executable inline scripts, in document order.
fn inline_scripts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("script:not([src])") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|script| {
            script
                .value()
                .attr("type")
                .map_or(true, |t| SCRIPT_TYPES.contains(&t.trim().to_ascii_lowercase().as_str()))
        })
        .map(|script| script.text().collect::<String>())
        .filter(|body| !body.trim().is_empty())
        .collect()
}

/// Run `scripts` in a fresh engine and snapshot the state containers.
fn execute_scripts(
    url: &Url,
    user_agent: &str,
    scripts: &[String],
    budget: Duration,
) -> Result<(Map<String, Value>, Option<String>), RenderError> {
    let engine = JsEngine::new(budget).map_err(|e| RenderError::Script(e.to_string()))?;
    engine
        .install_dom(url, user_agent)
        .map_err(|e| RenderError::Script(e.to_string()))?;

    let mut executed = 0;
    for (i, script) in scripts.iter().enumerate() {
        match engine.run(script) {
            Ok(()) => executed += 1,
            Err(e) => debug!(script = i, chars = script.len(), "Inline script failed: {e}"),
        }
    }
    engine.drain_jobs();
    debug!(executed, total = scripts.len(), "Inline scripts executed");

    match engine.eval(&state_snapshot_script()) {
        Ok(raw) => Ok(parse_state_snapshot(&raw)),
        Err(e) => {
            warn!("State snapshot failed: {e}");
            Ok((Map::new(), Some(format!("state snapshot failed: {e}"))))
        }
    }
}

/// Find `window.NAME = {...}` (or `self.`, `var`, or a JSON `<script id=NAME>`)
/// in raw markup and parse the literal.
fn extract_assigned_json(html: &str, name: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    if let Ok(selector) = Selector::parse(&format!("script[id=\"{name}\"]")) {
        if let Some(script) = document.select(&selector).next() {
            let body = script.text().collect::<String>();
            if let Some(value) = parse_capped(body.trim()) {
                return Some(value);
            }
        }
    }

    for prefix in ["window.", "self.", "var "] {
        let pattern = format!("{prefix}{name}");
        let mut from = 0;

        while let Some(found) = html[from..].find(&pattern) {
            let after = from + found + pattern.len();
            from = after;

            let rest = html[after..].trim_start();
            let Some(rhs) = rest.strip_prefix('=') else {
                continue;
            };
            if rhs.starts_with('=') {
                continue;
            }
            let rhs = rhs.trim_start();
            if let Some(value) = json_literal(rhs).and_then(parse_capped) {
                return Some(value);
            }
        }
    }

    None
}

/// Parse a JSON literal with nesting past [`SNAPSHOT_MAX_DEPTH`] truncated,
/// the same way the page-side snapshot does.
fn parse_capped(literal: &str) -> Option<Value> {
    serde_json::from_str(&cap_depth(literal, SNAPSHOT_MAX_DEPTH)).ok()
}

/// Replace every array or object opened at `max_depth` with [`TRUNCATED_MARKER`].
fn cap_depth(literal: &str, max_depth: usize) -> Cow<'_, str> {
    let mut out = String::new();
    let mut truncated = false;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while let Some(c) = literal[i..].chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '{' | '[' if depth == max_depth => {
                    let Some(nested) = json_literal(&literal[i..]) else {
                        return Cow::Borrowed(literal);
                    };
                    out.push('"');
                    out.push_str(TRUNCATED_MARKER);
                    out.push('"');
                    i += nested.len();
                    truncated = true;
                    continue;
                }
                '{' | '[' => depth += 1,
                '}' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        out.push(c);
        i += c.len_utf8();
    }

    if truncated {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(literal)
    }
}

/// Leading balanced `{...}` or `[...]` of `s`, string-aware.
fn json_literal(s: &str) -> Option<&str> {
    let (open, close) = match s.chars().next()? {
        '{' => ('{', '}'),
        '[' => ('[', ']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
