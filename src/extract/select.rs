//! Candidate selection, protocol normalization and filename derivation.

use serde::{Deserialize, Serialize};
use url::Url;

/// Filename used when the resolved URL has no usable last path segment.
pub const DEFAULT_FILENAME: &str = "video.mp4";

/// Which raw candidates selection accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Only candidates starting with `http`. Protocol-relative candidates are rejected.
    #[default]
    Strict,
    /// Also accept `//host/...` candidates, which normalization then upgrades to https.
    AllowProtocolRelative,
}

impl SelectionPolicy {
    /// Whether a raw candidate passes the selection predicate.
    pub fn accepts(self, candidate: &str) -> bool {
        match self {
            Self::Strict => candidate.starts_with("http"),
            Self::AllowProtocolRelative => {
                candidate.starts_with("http") || candidate.starts_with("//")
            }
        }
    }
}

/// Upgrade a protocol-relative URL (`//host/path`) to `https:`.
pub fn normalize_protocol(candidate: &str) -> String {
    if candidate.starts_with("//") {
        format!("https:{candidate}")
    } else {
        candidate.to_string()
    }
}

/// Suggested download filename: last segment of the URL path.
pub fn filename_for(video_url: &str) -> String {
    Url::parse(video_url)
        .ok()
        .and_then(|url| {
            url.path()
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_requires_http_prefix() {
        let policy = SelectionPolicy::Strict;
        assert!(policy.accepts("https://cdn/v.mp4"));
        assert!(policy.accepts("http://cdn/v.mp4"));
        assert!(!policy.accepts("//cdn.example.com/v.mp4"));
        assert!(!policy.accepts("blob:https://www.instagram.com/abc"));
        assert!(!policy.accepts("/relative/v.mp4"));
    }

    #[test]
    fn relaxed_policy_admits_protocol_relative() {
        let policy = SelectionPolicy::AllowProtocolRelative;
        assert!(policy.accepts("//cdn.example.com/v.mp4"));
        assert!(!policy.accepts("/relative/v.mp4"));
    }

    #[test]
    fn normalizes_protocol_relative_urls() {
        assert_eq!(
            normalize_protocol("//cdn.example.com/v.mp4"),
            "https://cdn.example.com/v.mp4"
        );
    }

    #[test]
    fn normalization_leaves_absolute_urls_alone() {
        assert_eq!(normalize_protocol("http://cdn/v.mp4"), "http://cdn/v.mp4");
        assert_eq!(normalize_protocol("https://cdn/v.mp4"), "https://cdn/v.mp4");
    }

    #[test]
    fn filename_is_last_path_segment() {
        assert_eq!(
            filename_for("https://cdn.example.com/media/clip123.mp4?x=1"),
            "clip123.mp4"
        );
        assert_eq!(filename_for("https://x.cdn/v1.mp4"), "v1.mp4");
    }

    #[test]
    fn filename_defaults_for_empty_path() {
        assert_eq!(filename_for("https://cdn.example.com"), DEFAULT_FILENAME);
        assert_eq!(filename_for("https://cdn.example.com/"), DEFAULT_FILENAME);
        assert_eq!(filename_for("https://cdn.example.com/?file=a.mp4"), DEFAULT_FILENAME);
    }

    #[test]
    fn filename_ignores_trailing_slash() {
        assert_eq!(filename_for("https://cdn.example.com/media/reel/"), "reel");
    }

    #[test]
    fn filename_defaults_for_unparsable_url() {
        assert_eq!(filename_for("not a url"), DEFAULT_FILENAME);
    }
}
