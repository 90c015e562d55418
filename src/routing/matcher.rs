//! Prefix matching and path rewriting.
//!
//! # Responsibilities
//! - Match a request path against a route prefix (case-sensitive)
//! - Rewrite the forwarded path when the route strips its prefix
//!
//! # Design Decisions
//! - Prefixes match on segment boundaries: `/api` matches `/api` and
//!   `/api/users` but not `/apiary`
//! - A prefix ending in `/` matches any path starting with it
//! - No regex to guarantee O(len) matching
//! - The query string is carried over byte-for-byte

use axum::http::Uri;

/// Matches the request path prefix on segment boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        rest.is_empty() || self.prefix.ends_with('/') || rest.starts_with('/')
    }
}

/// Build the path-and-query sent upstream.
///
/// With `strip` the matched prefix is removed; the result always starts with
/// `/`. The query string is preserved untouched.
pub fn rewrite_path(uri: &Uri, prefix: &str, strip: bool) -> String {
    let path = uri.path();
    let path = if strip {
        path.strip_prefix(prefix).unwrap_or(path)
    } else {
        path
    };

    let mut rewritten = String::with_capacity(path.len() + 1 + uri.query().map_or(0, |q| q.len() + 1));
    if !path.starts_with('/') {
        rewritten.push('/');
    }
    rewritten.push_str(path);

    if let Some(query) = uri.query() {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    rewritten
}
