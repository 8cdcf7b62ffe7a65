//! Candidate-extraction pipeline.
//!
//! Runs every strategy against one rendered snapshot, records each raw
//! output in a [`MethodTrace`], and selects the first candidate (in priority
//! order) that passes the [`SelectionPolicy`].
//!
//! # Example
//!
//! ```rust
//! use reelgrab::{Pipeline, RenderedDocument};
//!
//! let doc = RenderedDocument::from_html(
//!     "https://instagram.com/reel/abc",
//!     r#"<video src="https://x.cdn/v1.mp4"></video>"#,
//! );
//! let extraction = Pipeline::default().run(&doc);
//! assert_eq!(extraction.video_url.as_deref(), Some("https://x.cdn/v1.mp4"));
//! assert!(extraction.result.found);
//! ```

pub mod select;
pub mod state_walk;
pub mod strategies;

use std::panic::{catch_unwind, AssertUnwindSafe};

use scraper::Html;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::document::RenderedDocument;
use select::{filename_for, normalize_protocol, SelectionPolicy};
use state_walk::WalkLimits;
use strategies::{Probe, Strategy, STRATEGIES};

/// Trace key of a strategy output. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    VideoSrc,
    OgVideo,
    LdContentUrl,
    LdVideoContentUrl,
    SharedData,
    BruteforceMp4,
}

impl Method {
    /// All methods in priority order.
    pub const ALL: [Method; 6] = [
        Method::VideoSrc,
        Method::OgVideo,
        Method::LdContentUrl,
        Method::LdVideoContentUrl,
        Method::SharedData,
        Method::BruteforceMp4,
    ];

    /// Key used in the debug trace.
    pub fn key(self) -> &'static str {
        match self {
            Method::VideoSrc => "video_src",
            Method::OgVideo => "og_video",
            Method::LdContentUrl => "ld_contentUrl",
            Method::LdVideoContentUrl => "ld_video_contentUrl",
            Method::SharedData => "shared_data",
            Method::BruteforceMp4 => "bruteforce_mp4",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Raw output of every strategy, indexed by [`Method`].
///
/// Serializes as a map in priority order with absent entries omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodTrace {
    entries: [Option<String>; 6],
}

impl MethodTrace {
    pub fn get(&self, method: Method) -> Option<&str> {
        self.entries[method.index()].as_deref()
    }

    pub fn record(&mut self, method: Method, candidate: String) {
        self.entries[method.index()] = Some(candidate);
    }

    /// Present entries in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Method, &str)> {
        Method::ALL
            .into_iter()
            .filter_map(|m| self.get(m).map(|candidate| (m, candidate)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// First present candidate accepted by `policy`, in priority order.
    pub fn select(&self, policy: SelectionPolicy) -> Option<(Method, &str)> {
        self.iter().find(|(_, candidate)| policy.accepts(candidate))
    }
}

impl Serialize for MethodTrace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present: Vec<(Method, &str)> = self.iter().collect();
        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (method, candidate) in present {
            map.serialize_entry(method.key(), candidate)?;
        }
        map.end()
    }
}

/// Debug trace returned with every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub found: bool,
    pub methods: MethodTrace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pipeline output: the trace plus the resolved video URL, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub result: ExtractionResult,
    pub video_url: Option<String>,
    pub selected: Option<Method>,
}

impl Extraction {
    /// Suggested filename for the resolved URL.
    pub fn filename(&self) -> Option<String> {
        self.video_url.as_deref().map(filename_for)
    }
}

/// The extraction pipeline. Cheap to construct, holds only tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline {
    pub policy: SelectionPolicy,
    pub limits: WalkLimits,
}

impl Pipeline {
    #[must_use]
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            limits: WalkLimits::default(),
        }
    }

    /// Run all strategies against `doc` and select a candidate.
    pub fn run(&self, doc: &RenderedDocument) -> Extraction {
        self.run_with(doc, STRATEGIES)
    }

    fn run_with(&self, doc: &RenderedDocument, strategies: &[(&str, Strategy)]) -> Extraction {
        let dom = Html::parse_document(&doc.html);
        let probe = Probe {
            doc,
            dom: &dom,
            limits: self.limits,
        };

        let mut methods = MethodTrace::default();
        let mut selected: Option<(Method, String)> = None;

        for (name, strategy) in strategies {
            match catch_unwind(AssertUnwindSafe(|| strategy(&probe))) {
                Ok(Some((method, candidate))) => {
                    debug!(strategy = name, method = method.key(), candidate = %candidate, "Strategy produced candidate");
                    if selected.is_none() && self.policy.accepts(&candidate) {
                        selected = Some((method, candidate.clone()));
                    }
                    methods.record(method, candidate);
                }
                Ok(None) => debug!(strategy = name, "Strategy found nothing"),
                Err(_) => warn!(strategy = name, url = %doc.url, "Strategy panicked, skipping"),
            }
        }

        let video_url = selected
            .as_ref()
            .map(|(_, candidate)| normalize_protocol(candidate));

        Extraction {
            result: ExtractionResult {
                found: video_url.is_some(),
                methods,
                error: doc.snapshot_error.clone(),
            },
            video_url,
            selected: selected.map(|(method, _)| method),
        }
    }
}
