//! Request validation, applied before any rendering happens.

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::allowlist::AllowList;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No url provided")]
    Missing,

    #[error("Invalid URL")]
    Malformed,

    #[error("Only {supported} URLs supported")]
    UnsupportedHost { supported: String },
}

/// Validate the `url` field of a request body.
pub fn validate_request(body: Option<&Value>, allow: &AllowList) -> Result<Url, ValidationError> {
    let raw = body
        .and_then(|b| b.get("url"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::Missing)?;

    validate_url(raw, allow)
}

/// Parse a target URL and check it against the allow-list.
pub fn validate_url(raw: &str, allow: &AllowList) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim()).map_err(|_| ValidationError::Malformed)?;

    if allow.allows(&url) {
        Ok(url)
    } else {
        Err(ValidationError::UnsupportedHost {
            supported: allow.describe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_supported_url() {
        let body = json!({"url": "https://instagram.com/reel/abc"});
        let url = validate_request(Some(&body), &AllowList::default()).unwrap();
        assert_eq!(url.host_str(), Some("instagram.com"));
    }

    #[test]
    fn missing_body_or_field() {
        let allow = AllowList::default();
        assert_eq!(validate_request(None, &allow), Err(ValidationError::Missing));
        assert_eq!(
            validate_request(Some(&json!({})), &allow),
            Err(ValidationError::Missing)
        );
        assert_eq!(
            validate_request(Some(&json!({"url": ""})), &allow),
            Err(ValidationError::Missing)
        );
    }

    #[test]
    fn non_string_url_is_missing() {
        let allow = AllowList::default();
        assert_eq!(
            validate_request(Some(&json!({"url": 42})), &allow),
            Err(ValidationError::Missing)
        );
        assert_eq!(
            validate_request(Some(&json!({"url": ["https://instagram.com/p/x"]})), &allow),
            Err(ValidationError::Missing)
        );
    }

    #[test]
    fn malformed_url() {
        let allow = AllowList::default();
        assert_eq!(
            validate_url("instagram.com/reel/abc", &allow),
            Err(ValidationError::Malformed)
        );
        assert_eq!(validate_url("http://", &allow), Err(ValidationError::Malformed));
    }

    #[test]
    fn disallowed_host_lists_supported_platforms() {
        let err = validate_url("https://example.com/page", &AllowList::default()).unwrap_err();
        assert_eq!(err.to_string(), "Only Instagram / Facebook URLs supported");
    }
}
