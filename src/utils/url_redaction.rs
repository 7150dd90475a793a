//! Credential redaction for logged URLs.
//!
//! Streaming addresses carry the access token as a query parameter. Anything
//! that logs such an address goes through [`redact_url`] first.

use url::Url;

/// Query parameters whose values are never logged.
pub const SENSITIVE_QUERY_PARAMS: &[&str] = &["access_token"];

const REDACTED: &str = "REDACTED";

/// Render `url` with every sensitive query value replaced by `REDACTED`.
pub fn redact_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            if SENSITIVE_QUERY_PARAMS.contains(&key.as_ref()) {
                (key.into_owned(), REDACTED.to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
