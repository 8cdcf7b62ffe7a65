//! Supported-platform allow-list.
//!
//! Target pages are only rendered when their host matches one of the
//! configured [`HostRule`]s. Rules are data so they can come from the config
//! file; the defaults cover Instagram and Facebook.

use serde::{Deserialize, Serialize};
use url::Url;

/// How a rule's pattern is compared against a hostname.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMatch {
    /// Case-insensitive substring of the hostname.
    #[default]
    Contains,
    /// Hostname equals the pattern or is a subdomain of it.
    Suffix,
}

/// One supported platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRule {
    /// Display name used in error messages (e.g. "Instagram").
    pub name: String,
    /// Host pattern (e.g. "instagram.com").
    pub pattern: String,
    #[serde(default, rename = "match")]
    pub kind: HostMatch,
}

impl HostRule {
    pub fn contains(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            kind: HostMatch::Contains,
        }
    }

    /// Check a hostname against this rule.
    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let pattern = self.pattern.to_ascii_lowercase();

        match self.kind {
            HostMatch::Contains => host.contains(&pattern),
            HostMatch::Suffix => {
                host == pattern
                    || host
                        .strip_suffix(&pattern)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }
}

/// Ordered set of supported-platform rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    rules: Vec<HostRule>,
}

impl AllowList {
    pub fn new(rules: Vec<HostRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[HostRule] {
        &self.rules
    }

    /// First rule matching the URL's host.
    pub fn matching_rule(&self, url: &Url) -> Option<&HostRule> {
        let host = url.host_str()?;
        self.rules.iter().find(|rule| rule.matches(host))
    }

    pub fn allows(&self, url: &Url) -> bool {
        self.matching_rule(url).is_some()
    }

    /// Human-readable list of supported platforms, e.g. "Instagram / Facebook".
    pub fn describe(&self) -> String {
        self.rules
            .iter()
            .map(|rule| rule.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(vec![
            HostRule::contains("Instagram", "instagram.com"),
            HostRule::contains("Facebook", "facebook.com"),
        ])
    }
}
