//! HTTP conditional request module
//!
//! Provides `ETag` / `Last-Modified` generation and `If-None-Match` /
//! `If-Modified-Since` evaluation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Weak `ETag` derived from file size and modification time
///
/// # Returns
/// Header value such as `W/"1024-1700000000123456789"`
pub fn weak_etag(size: u64, modified: SystemTime) -> String {
    let mtime_nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("W/\"{size}-{mtime_nanos}\"")
}

/// Format a modification time as an HTTP date
pub fn last_modified(modified: SystemTime) -> String {
    httpdate::fmt_http_date(modified)
}

/// Decide whether a 304 should be sent
///
/// `If-None-Match` wins over `If-Modified-Since` when both are present.
pub fn is_not_modified(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    etag: &str,
    modified: SystemTime,
) -> bool {
    if let Some(tags) = if_none_match {
        return etag_matches(tags, etag);
    }
    if_modified_since.is_some_and(|since| not_modified_since(since, modified))
}

/// Weak comparison of an `If-None-Match` list against our `ETag`
///
/// Supports single tags, comma separated lists, `W/` prefixes and `*`.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let ours = opaque_tag(etag);
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || (!candidate.is_empty() && opaque_tag(candidate) == ours)
    })
}

fn opaque_tag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// True when `modified` is not newer than the client's copy
///
/// HTTP dates have second precision, so the sub-second part is dropped first.
/// Unparseable dates never match.
fn not_modified_since(since: &str, modified: SystemTime) -> bool {
    let Ok(since) = httpdate::parse_http_date(since) else {
        return false;
    };
    let secs = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs) <= since
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_weak_etag_format() {
        let etag = weak_etag(1024, UNIX_EPOCH + Duration::from_nanos(1_500));
        assert_eq!(etag, "W/\"1024-1500\"");
    }

    #[test]
    fn test_etag_matches() {
        let etag = "W/\"5-10\"";
        assert!(etag_matches("W/\"5-10\"", etag));
        assert!(etag_matches("\"5-10\"", etag));
        assert!(etag_matches("\"a\", W/\"5-10\"", etag));
        assert!(etag_matches("*", etag));
        assert!(!etag_matches("\"5-11\"", etag));
        assert!(!etag_matches("", etag));
    }

    #[test]
    fn test_if_modified_since() {
        let modified = at(1_700_000_000) + Duration::from_millis(400);
        let same = last_modified(at(1_700_000_000));
        let older = last_modified(at(1_600_000_000));

        assert!(is_not_modified(None, Some(&same), "x", modified));
        assert!(!is_not_modified(None, Some(&older), "x", modified));
        assert!(!is_not_modified(None, Some("yesterday"), "x", modified));
        assert!(!is_not_modified(None, None, "x", modified));
    }

    #[test]
    fn test_if_none_match_takes_precedence() {
        let modified = at(1_700_000_000);
        let same = last_modified(modified);
        assert!(!is_not_modified(Some("\"other\""), Some(&same), "W/\"1-2\"", modified));
    }
}
