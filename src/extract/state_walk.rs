//! Bounded depth-first search over page state.
//!
//! Platforms bury media URLs several levels deep inside their hydration
//! payloads. The walk checks an object's own keys before descending, and
//! visits children in enumeration order, so the first hit is the one a
//! top-down reader would see first.

use serde_json::Value;

/// Keys that carry a media URL, in preference order.
pub const MEDIA_KEYS: &[&str] = &["video_url", "display_url"];

/// Limits that make termination explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Nodes deeper than this are not inspected.
    pub max_depth: usize,
    /// Total nodes the walk may visit before giving up.
    pub max_nodes: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 100_000,
        }
    }
}

/// Outcome of a walk, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub found: Option<String>,
    pub visited: usize,
    pub budget_exhausted: bool,
}

/// Find the first media URL string in `root`.
pub fn find_media_url(root: &Value, limits: WalkLimits) -> WalkOutcome {
    let mut walker = Walker {
        limits,
        visited: 0,
        exhausted: false,
    };
    let found = walker.visit(root, 0);
    WalkOutcome {
        found,
        visited: walker.visited,
        budget_exhausted: walker.exhausted,
    }
}

struct Walker {
    limits: WalkLimits,
    visited: usize,
    exhausted: bool,
}

impl Walker {
    fn visit(&mut self, node: &Value, depth: usize) -> Option<String> {
        if depth > self.limits.max_depth || self.exhausted {
            return None;
        }
        if self.visited >= self.limits.max_nodes {
            self.exhausted = true;
            return None;
        }
        self.visited += 1;

        match node {
            Value::Object(map) => {
                for key in MEDIA_KEYS {
                    if let Some(Value::String(s)) = map.get(*key) {
                        if !s.is_empty() {
                            return Some(s.clone());
                        }
                    }
                }
                map.values().find_map(|child| self.visit(child, depth + 1))
            }
            Value::Array(items) => items.iter().find_map(|child| self.visit(child, depth + 1)),
            _ => None,
        }
    }
}
