//! Individual candidate strategies.
//!
//! Each strategy inspects one kind of signal in the snapshot and returns the
//! raw candidate it found, tagged with the trace key it belongs to. They are
//! independent of each other and never validate what they return.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::state_walk::{find_media_url, WalkLimits};
use super::Method;
use crate::document::{is_truthy, RenderedDocument};

/// Open Graph properties, most specific first.
const OG_VIDEO_PROPERTIES: &[&str] = &["og:video:secure_url", "og:video", "og:video:url"];

static MP4_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^"']+\.mp4[^"']*"#).expect("mp4 pattern is valid")
});

/// Everything a strategy may look at.
pub struct Probe<'a> {
    pub doc: &'a RenderedDocument,
    pub dom: &'a Html,
    pub limits: WalkLimits,
}

/// A strategy: snapshot in, optional tagged candidate out.
pub type Strategy = fn(&Probe<'_>) -> Option<(Method, String)>;

/// Strategies in priority order, with names used in logs.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("video_element", video_src),
    ("open_graph", og_video),
    ("ld_json", ld_json),
    ("client_state", shared_data),
    ("bruteforce", bruteforce_mp4),
];

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// `src` attribute of the first `<video>` element, resolved the way
/// `HTMLMediaElement.src` is. `<source>` children are not consulted.
pub fn video_src(probe: &Probe<'_>) -> Option<(Method, String)> {
    let video = probe.dom.select(&selector("video")?).next()?;
    let raw = video.value().attr("src").map(str::trim).filter(|s| !s.is_empty())?;

    Some((Method::VideoSrc, resolve_against(&probe.doc.url, raw)))
}

fn resolve_against(base: &str, raw: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(raw))
        .map_or_else(|_| raw.to_string(), String::from)
}

/// `content` of the preferred Open Graph video tag.
///
/// Only the first tag present (by property preference) is consulted; an empty
/// `content` on it is not a reason to fall back to a less specific property.
pub fn og_video(probe: &Probe<'_>) -> Option<(Method, String)> {
    let meta = OG_VIDEO_PROPERTIES.iter().find_map(|property| {
        let css = format!(r#"meta[property="{property}"]"#);
        probe.dom.select(&selector(&css)?).next()
    })?;

    meta.value()
        .attr("content")
        .filter(|content| !content.is_empty())
        .map(|content| (Method::OgVideo, content.to_string()))
}

/// First `contentUrl` (or `video.contentUrl`) across ld+json blocks.
pub fn ld_json(probe: &Probe<'_>) -> Option<(Method, String)> {
    let scripts = selector(r#"script[type="application/ld+json"]"#)?;

    for (index, script) in probe.dom.select(&scripts).enumerate() {
        let text = script.text().collect::<String>();
        let json: Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(e) => {
                debug!(index, error = %e, "Skipping malformed ld+json block");
                continue;
            }
        };

        if let Some(url) = truthy_candidate(json.get("contentUrl")) {
            return Some((Method::LdContentUrl, url));
        }
        if let Some(url) = truthy_candidate(json.get("video").and_then(|v| v.get("contentUrl"))) {
            return Some((Method::LdVideoContentUrl, url));
        }
    }

    None
}

/// A truthy value as a trace candidate. Non-strings are kept as JSON text so
/// they still end the scan but never pass selection.
fn truthy_candidate(value: Option<&Value>) -> Option<String> {
    let value = value.filter(|v| is_truthy(v))?;
    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// First `video_url` / `display_url` inside the page's global state.
pub fn shared_data(probe: &Probe<'_>) -> Option<(Method, String)> {
    let (name, state) = probe.doc.state_container()?;
    let outcome = find_media_url(state, probe.limits);

    debug!(
        container = name,
        visited = outcome.visited,
        budget_exhausted = outcome.budget_exhausted,
        "Walked client state"
    );

    outcome.found.map(|url| (Method::SharedData, url))
}

/// Any `.mp4` URL anywhere in the markup.
pub fn bruteforce_mp4(probe: &Probe<'_>) -> Option<(Method, String)> {
    MP4_URL
        .find(&probe.doc.html)
        .map(|m| (Method::BruteforceMp4, m.as_str().to_string()))
}
