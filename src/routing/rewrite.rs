//! Path rewriting module
//!
//! Maps an incoming request path onto the path the file cache should see:
//! the configured URL prefix is stripped, or the request is rejected when the
//! prefix does not match.

use clap::ValueEnum;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;

/// Configured URL prefix
///
/// Always either empty (no filtering) or of the form `/seg[/seg...]` without a
/// trailing slash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefix(String);

impl Prefix {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            Self(String::new())
        } else if trimmed.starts_with('/') {
            Self(trimmed.to_string())
        } else {
            Self(format!("/{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of `/`-introduced segments in the prefix
    fn segment_count(&self) -> usize {
        self.0.bytes().filter(|&b| b == b'/').count()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of matching a request path against the prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteResult {
    /// Path with the prefix consumed, ready for the file cache
    Rewritten(String),
    /// Path outside the prefix; must not reach the file cache
    Rejected,
}

/// Prefix matching policy used by the request router
pub trait PathMatcher: Send + Sync + fmt::Debug {
    fn rewrite(&self, path: &str) -> RewriteResult;
}

/// Selects which [`PathMatcher`] the router uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Leading segments must equal the prefix literally and be followed by more path
    #[default]
    Exact,
    /// Legacy: compare the first segment only, pass mismatches through
    FirstSegment,
}

impl MatchStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::FirstSegment => "first-segment",
        }
    }

    pub fn matcher(self, prefix: Prefix) -> Box<dyn PathMatcher> {
        match self {
            Self::Exact => Box::new(ExactPrefix::new(prefix)),
            Self::FirstSegment => Box::new(FirstSegment::new(prefix)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExactPrefix {
    prefix: Prefix,
}

impl ExactPrefix {
    pub const fn new(prefix: Prefix) -> Self {
        Self { prefix }
    }
}

impl PathMatcher for ExactPrefix {
    fn rewrite(&self, path: &str) -> RewriteResult {
        rewrite_path(&self.prefix, path)
    }
}

#[derive(Debug, Clone)]
pub struct FirstSegment {
    prefix: Prefix,
}

impl FirstSegment {
    pub const fn new(prefix: Prefix) -> Self {
        Self { prefix }
    }
}

impl PathMatcher for FirstSegment {
    fn rewrite(&self, path: &str) -> RewriteResult {
        rewrite_first_segment(&self.prefix, path)
    }
}

/// Ensure the path starts with `/`
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

/// Strip `prefix` from `path`
///
/// The path is split right before the `/` that ends its first N segments,
/// N being the number of segments in the prefix. The request matches when the
/// head equals the prefix and something (at least a `/`) follows it. The tail
/// is returned verbatim: no decoding, no slash collapsing.
pub fn rewrite_path(prefix: &Prefix, path: &str) -> RewriteResult {
    let path = normalize_path(path);
    if prefix.is_empty() {
        return RewriteResult::Rewritten(path.into_owned());
    }

    let (head, tail) = split_path(&path, prefix.segment_count());
    if tail.is_empty() || head != prefix.as_str() {
        return RewriteResult::Rejected;
    }
    RewriteResult::Rewritten(tail.to_string())
}

/// Legacy matching on the first path segment
///
/// Slashes around both the path and the prefix are ignored. Paths whose first
/// segment differs are passed through unchanged.
pub fn rewrite_first_segment(prefix: &Prefix, path: &str) -> RewriteResult {
    let path = normalize_path(path);
    if prefix.is_empty() {
        return RewriteResult::Rewritten(path.into_owned());
    }

    let wanted = prefix.as_str().trim_matches('/');
    let trimmed = path.trim_matches('/');
    let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    if first == wanted {
        RewriteResult::Rewritten(format!("/{rest}"))
    } else {
        RewriteResult::Rewritten(path.into_owned())
    }
}

/// Split before the `segments`-th `/` found after index 0
fn split_path(path: &str, segments: usize) -> (&str, &str) {
    let split_at = path
        .bytes()
        .enumerate()
        .skip(1)
        .filter(|&(_, b)| b == b'/')
        .nth(segments.saturating_sub(1))
        .map(|(i, _)| i);

    match split_at {
        Some(i) => path.split_at(i),
        None => (path, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewritten(path: &str) -> RewriteResult {
        RewriteResult::Rewritten(path.to_string())
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(Prefix::new("").as_str(), "");
        assert_eq!(Prefix::new("/").as_str(), "");
        assert_eq!(Prefix::new("static").as_str(), "/static");
        assert_eq!(Prefix::new("/static/").as_str(), "/static");
        assert_eq!(Prefix::new("/static//").as_str(), "/static");
        assert_eq!(Prefix::new("a/b/").as_str(), "/a/b");
    }

    #[test]
    fn test_strips_prefix() {
        let prefix = Prefix::new("/static");
        assert_eq!(rewrite_path(&prefix, "/static/img/a.png"), rewritten("/img/a.png"));
        assert_eq!(rewrite_path(&prefix, "/static/"), rewritten("/"));
    }

    #[test]
    fn test_bare_prefix_rejected() {
        for raw in ["/static", "/a", "/a/b"] {
            let prefix = Prefix::new(raw);
            assert_eq!(rewrite_path(&prefix, raw), RewriteResult::Rejected, "{raw}");
        }
    }

    #[test]
    fn test_mismatch_rejected() {
        let prefix = Prefix::new("/static");
        assert_eq!(rewrite_path(&prefix, "/other/x"), RewriteResult::Rejected);
        assert_eq!(rewrite_path(&prefix, "/"), RewriteResult::Rejected);
        assert_eq!(rewrite_path(&prefix, ""), RewriteResult::Rejected);
        assert_eq!(rewrite_path(&prefix, "/statics/x"), RewriteResult::Rejected);
    }

    #[test]
    fn test_no_partial_segment_match() {
        let prefix = Prefix::new("/a");
        assert_eq!(rewrite_path(&prefix, "/ab/x"), RewriteResult::Rejected);
        assert_eq!(rewrite_path(&prefix, "/ab"), RewriteResult::Rejected);
    }

    #[test]
    fn test_empty_prefix_passes_through() {
        let prefix = Prefix::new("");
        for path in ["/anything/here", "/", "//double//slash", "/%20encoded"] {
            assert_eq!(rewrite_path(&prefix, path), rewritten(path));
        }
        assert_eq!(rewrite_path(&prefix, "relative/path"), rewritten("/relative/path"));
    }

    #[test]
    fn test_missing_leading_slash_is_added() {
        let prefix = Prefix::new("/static");
        assert_eq!(rewrite_path(&prefix, "static/x"), rewritten("/x"));
    }

    #[test]
    fn test_tail_kept_verbatim() {
        let prefix = Prefix::new("/static");
        assert_eq!(rewrite_path(&prefix, "/static//a//b/"), rewritten("//a//b/"));
        assert_eq!(rewrite_path(&prefix, "/static/a%2Fb"), rewritten("/a%2Fb"));
        assert_eq!(rewrite_path(&prefix, "/static/../x"), rewritten("/../x"));
    }

    #[test]
    fn test_multi_segment_prefix() {
        let prefix = Prefix::new("/a/b");
        assert_eq!(rewrite_path(&prefix, "/a/b/c/d"), rewritten("/c/d"));
        assert_eq!(rewrite_path(&prefix, "/a/bc/d"), RewriteResult::Rejected);
        assert_eq!(rewrite_path(&prefix, "/a/c/d"), RewriteResult::Rejected);
    }

    #[test]
    fn test_prefix_plus_rest_property() {
        for raw in ["/static", "/a", "/a/b", "/x-y_z"] {
            let prefix = Prefix::new(raw);
            for rest in ["f", "dir/f.txt", "/", "a//b"] {
                let path = format!("{raw}/{rest}");
                assert_eq!(rewrite_path(&prefix, &path), rewritten(&format!("/{rest}")), "{path}");
            }
        }
    }

    #[test]
    fn test_first_segment_strategy() {
        let prefix = Prefix::new("/static");
        assert_eq!(rewrite_first_segment(&prefix, "/static/img/a.png"), rewritten("/img/a.png"));
        assert_eq!(rewrite_first_segment(&prefix, "/static"), rewritten("/"));
        assert_eq!(rewrite_first_segment(&prefix, "/static/"), rewritten("/"));
        assert_eq!(rewrite_first_segment(&prefix, "/other/x"), rewritten("/other/x"));
        assert_eq!(rewrite_first_segment(&prefix, "//static/x"), rewritten("/x"));
    }

    #[test]
    fn test_strategies_disagree_on_nested_prefix() {
        let prefix = Prefix::new("/a/b");
        let exact = MatchStrategy::Exact.matcher(prefix.clone());
        let legacy = MatchStrategy::FirstSegment.matcher(prefix);

        assert_eq!(exact.rewrite("/a/b/c"), rewritten("/c"));
        // "a" never equals "a/b", so the legacy matcher leaves the path alone
        assert_eq!(legacy.rewrite("/a/b/c"), rewritten("/a/b/c"));
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/static/img/a.png", 1), ("/static", "/img/a.png"));
        assert_eq!(split_path("/static", 1), ("/static", ""));
        assert_eq!(split_path("/a/b/c", 2), ("/a/b", "/c"));
        assert_eq!(split_path("/", 1), ("/", ""));
    }
}
