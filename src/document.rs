//! Rendered document snapshot.
//!
//! A [`RenderedDocument`] is what every renderer hands to the extraction
//! pipeline: the serialized markup after scripts ran, plus a JSON snapshot
//! of the page-global state containers that platforms use to ship their
//! initial data.

use serde_json::{Map, Value};

/// Global state containers inspected by the client-state walk, in priority order.
pub const STATE_CONTAINERS: &[&str] = &[
    "_sharedData",
    "__additionalData",
    "__INITIAL_STATE__",
    "__INITIAL_DATA__",
];

/// Immutable snapshot of a rendered page.
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    /// Final URL of the page (after redirects).
    pub url: String,
    /// Serialized `document.documentElement` markup.
    pub html: String,
    /// Snapshot of the global containers that exist on the page, keyed by name.
    pub globals: Map<String, Value>,
    /// Set when the renderer could not capture part of the snapshot.
    pub snapshot_error: Option<String>,
}

impl RenderedDocument {
    /// Snapshot made of markup only, with no global state.
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            ..Self::default()
        }
    }

    /// Attach a global container value.
    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    /// First truthy state container on the page, with its name.
    pub fn state_container(&self) -> Option<(&'static str, &Value)> {
        STATE_CONTAINERS.iter().find_map(|name| {
            self.globals
                .get(*name)
                .filter(|v| is_truthy(v))
                .map(|v| (*name, v))
        })
    }
}

/// JavaScript truthiness of a JSON value: `null`, `false`, `0` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
