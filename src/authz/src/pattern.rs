//! Colon-segment wildcard pattern matching
//!
//! Patterns and values are colon-delimited segment strings
//! (`documents:read`, `org:42:reports:*`). Matching rules:
//!
//! - a pattern of exactly `*` matches any value
//! - a trailing `*` segment matches that position and everything after
//!   it, including nothing (`a:b:*` matches `a:b`, `a:b:c`, `a:b:c:d`)
//! - an interior `*` matches exactly one segment at that position
//! - all other segments match literally and case-sensitively
//! - segment counts must align unless a trailing `*` absorbs the rest
//!
//! The same grammar applies to both the action and the resource
//! dimension of a statement.

use crate::error::{AuthzError, Result};
use warden_core::Statement;

const WILDCARD: &str = "*";

/// A parsed, validated pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    raw: String,
    segments: Vec<String>,
}

impl Pattern {
    /// Parse and validate a pattern string
    ///
    /// Rejects empty patterns, empty segments (`a::b`), and wildcards
    /// embedded inside a segment (`doc*`); a wildcard must occupy a
    /// whole segment.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(AuthzError::InvalidPattern("pattern is empty".to_string()));
        }

        let segments: Vec<String> = s.split(':').map(str::to_string).collect();

        for segment in &segments {
            if segment.is_empty() {
                return Err(AuthzError::InvalidPattern(format!(
                    "empty segment in '{}'",
                    s
                )));
            }
            if segment.contains('*') && segment != WILDCARD {
                return Err(AuthzError::InvalidPattern(format!(
                    "wildcard must occupy a whole segment: '{}'",
                    segment
                )));
            }
        }

        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }

    /// The original pattern string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a concrete value against this pattern
    pub fn matches(&self, value: &str) -> bool {
        // lone `*` matches everything
        if self.segments.len() == 1 && self.segments[0] == WILDCARD {
            return true;
        }

        let value_segments: Vec<&str> = value.split(':').collect();

        // trailing `*` absorbs the remainder, empty remainder included
        if self.segments.last().map(String::as_str) == Some(WILDCARD) {
            let prefix = &self.segments[..self.segments.len() - 1];
            if value_segments.len() < prefix.len() {
                return false;
            }
            return segments_match(prefix, &value_segments[..prefix.len()]);
        }

        if value_segments.len() != self.segments.len() {
            return false;
        }

        segments_match(&self.segments, &value_segments)
    }
}

/// Positional match where `*` stands for exactly one segment
fn segments_match(pattern: &[String], value: &[&str]) -> bool {
    pattern
        .iter()
        .zip(value.iter())
        .all(|(p, v)| p == WILDCARD || p == v)
}

/// Match a raw pattern string against a value
///
/// Unparseable patterns never match (fail closed); a malformed pattern
/// in stored policy data must not widen a grant.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    match Pattern::parse(pattern) {
        Ok(p) => p.matches(value),
        Err(e) => {
            tracing::warn!("rejecting malformed pattern: {}", e);
            false
        }
    }
}

/// Whether a statement applies to the requested (action, resource) pair
///
/// A statement matches only if at least one of its action patterns
/// matches the action AND at least one of its resource patterns matches
/// the resource. Empty pattern sets never match anything.
pub fn statement_matches(statement: &Statement, action: &str, resource: &str) -> bool {
    statement
        .actions
        .iter()
        .any(|p| pattern_matches(p, action))
        && statement
            .resources
            .iter()
            .any(|p| pattern_matches(p, resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::Effect;

    #[test]
    fn test_lone_wildcard_matches_anything() {
        assert!(pattern_matches("*", "docs:read"));
        assert!(pattern_matches("*", "a"));
        assert!(pattern_matches("*", "a:b:c:d:e"));
        assert!(pattern_matches("*", ""));
    }

    #[test]
    fn test_literal_match() {
        assert!(pattern_matches("docs:read", "docs:read"));
        assert!(!pattern_matches("docs:read", "docs:write"));
        assert!(!pattern_matches("docs:read", "Docs:read"));
    }

    #[test]
    fn test_trailing_glob_is_prefix_match() {
        assert!(pattern_matches("a:b:*", "a:b:c:d"));
        assert!(pattern_matches("a:b:*", "a:b:c"));
        // the glob also absorbs an empty remainder
        assert!(pattern_matches("a:b:*", "a:b"));
        assert!(!pattern_matches("a:b:*", "a"));
        assert!(!pattern_matches("a:b:*", "a:x:c"));
    }

    #[test]
    fn test_interior_wildcard_is_single_segment() {
        assert!(pattern_matches("a:*:c", "a:x:c"));
        assert!(!pattern_matches("a:*:c", "a:x:y"));
        assert!(!pattern_matches("a:*:c", "a:x:y:c"));
        assert!(!pattern_matches("a:*:c", "a:c"));
    }

    #[test]
    fn test_no_implicit_suffix_absorption() {
        assert!(!pattern_matches("a:b", "a:b:c"));
        assert!(!pattern_matches("a:b:c", "a:b"));
    }

    #[test]
    fn test_wildcard_in_trailing_glob_prefix() {
        assert!(pattern_matches("a:*:*", "a:x"));
        assert!(pattern_matches("a:*:*", "a:x:y:z"));
        assert!(!pattern_matches("a:*:*", "a"));
    }

    #[test]
    fn test_malformed_patterns_rejected() {
        assert!(Pattern::parse("").is_err());
        assert!(Pattern::parse("a::b").is_err());
        assert!(Pattern::parse("doc*").is_err());
        assert!(Pattern::parse("a:b*:c").is_err());
        // and never match via the string helper
        assert!(!pattern_matches("doc*", "docs"));
        assert!(!pattern_matches("", ""));
    }

    #[test]
    fn test_statement_requires_both_dimensions() {
        let statement = Statement {
            effect: Effect::Allow,
            actions: vec!["docs:*".to_string()],
            resources: vec!["org:42:*".to_string()],
        };

        assert!(statement_matches(&statement, "docs:read", "org:42:file7"));
        assert!(!statement_matches(&statement, "billing:read", "org:42:file7"));
        assert!(!statement_matches(&statement, "docs:read", "org:43:file7"));
    }

    #[test]
    fn test_empty_pattern_sets_never_match() {
        let no_actions = Statement {
            effect: Effect::Allow,
            actions: vec![],
            resources: vec!["*".to_string()],
        };
        assert!(!statement_matches(&no_actions, "docs:read", "file"));

        let no_resources = Statement {
            effect: Effect::Allow,
            actions: vec!["*".to_string()],
            resources: vec![],
        };
        assert!(!statement_matches(&no_resources, "docs:read", "file"));
    }
}
