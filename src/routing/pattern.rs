//! Route pattern compilation and path matching.
//!
//! # Responsibilities
//! - Compile a path template into typed segments
//! - Match concrete request paths and capture variables
//! - Rank patterns by specificity for table ordering
//!
//! # Template Syntax
//! ```text
//! /users              literal segments
//! /users/{id}         one non-empty segment, captured as "id"
//! /files/{*path}      remainder (zero or more segments), captured as "path"
//! /static/*           remainder, not captured
//! ```
//!
//! # Design Decisions
//! - Segment comparison only, no regex in the hot path
//! - Query strings and empty segments are insignificant for matching
//! - A match always yields a variable map; empty means "matched, nothing captured"

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Variables captured from a concrete path, keyed by variable name.
pub type PathVariables = HashMap<String, String>;

/// Errors raised while compiling a route template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("route pattern must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    #[error("route pattern {0:?} declares a variable without a name")]
    EmptyVariable(String),

    #[error("route pattern {0:?} has an unterminated variable segment")]
    UnterminatedVariable(String),

    #[error("route pattern {0:?} has a catch-all segment that is not last")]
    CatchAllNotLast(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
    CatchAll(Option<String>),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 2,
            Segment::Variable(_) => 1,
            Segment::CatchAll(_) => 0,
        }
    }

    fn is_catch_all(&self) -> bool {
        matches!(self, Segment::CatchAll(_))
    }
}

/// A compiled URL template. Immutable once built.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: Arc<str>,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a template such as `/people/{person}/files/{*path}`.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        if !template.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(template.to_string()));
        }

        let parts: Vec<&str> = segments_of(template).collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            let segment = parse_segment(template, part)?;
            if segment.is_catch_all() && index + 1 != parts.len() {
                return Err(PatternError::CatchAllNotLast(template.to_string()));
            }
            segments.push(segment);
        }

        Ok(Self {
            template: Arc::from(template),
            segments,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub(crate) fn shared_template(&self) -> Arc<str> {
        Arc::clone(&self.template)
    }

    /// Match a concrete path (query string allowed) against this pattern.
    ///
    /// Returns `None` on mismatch, otherwise the captured variables.
    pub fn matches(&self, path: &str) -> Option<PathVariables> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        let mut parts = segments_of(path);
        let mut captures = PathVariables::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    if parts.next()? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    let value = parts.next()?;
                    captures.insert(name.clone(), value.to_string());
                }
                Segment::CatchAll(name) => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    if let Some(name) = name {
                        captures.insert(name.clone(), rest.join("/"));
                    }
                    return Some(captures);
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(captures)
    }

    /// Total specificity order: `Less` means `self` is tried first.
    ///
    /// Segments are compared pairwise (literal > variable > catch-all). When one
    /// pattern is a prefix of the other, a trailing catch-all ranks below the
    /// shorter pattern; any other extra segment ranks above it.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        for (ours, theirs) in self.segments.iter().zip(&other.segments) {
            match theirs.rank().cmp(&ours.rank()) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }

        match self.segments.len().cmp(&other.segments.len()) {
            Ordering::Equal => Ordering::Equal,
            Ordering::Greater if self.segments[other.segments.len()].is_catch_all() => {
                Ordering::Greater
            }
            Ordering::Greater => Ordering::Less,
            Ordering::Less if other.segments[self.segments.len()].is_catch_all() => Ordering::Less,
            Ordering::Less => Ordering::Greater,
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn segments_of(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn parse_segment(template: &str, part: &str) -> Result<Segment, PatternError> {
    if part == "*" {
        return Ok(Segment::CatchAll(None));
    }

    let Some(inner) = part.strip_prefix('{') else {
        return Ok(Segment::Literal(part.to_string()));
    };
    let inner = inner
        .strip_suffix('}')
        .ok_or_else(|| PatternError::UnterminatedVariable(template.to_string()))?;

    match inner.strip_prefix('*') {
        Some("") => Err(PatternError::EmptyVariable(template.to_string())),
        Some(name) => Ok(Segment::CatchAll(Some(name.to_string()))),
        None if inner.is_empty() => Err(PatternError::EmptyVariable(template.to_string())),
        None => Ok(Segment::Variable(inner.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(template: &str) -> RoutePattern {
        RoutePattern::parse(template).unwrap()
    }

    #[test]
    fn literal_pattern_matches_with_empty_captures() {
        let p = pattern("/ping");
        assert_eq!(p.matches("/ping"), Some(PathVariables::new()));
        assert_eq!(p.matches("/ping/"), Some(PathVariables::new()));
        assert_eq!(p.matches("/ping?verbose=1"), Some(PathVariables::new()));
        assert!(p.matches("/pong").is_none());
        assert!(p.matches("/ping/extra").is_none());
    }

    #[test]
    fn variables_are_captured() {
        let p = pattern("/people/{person}/pets/{pet}");
        let captures = p.matches("/people/ada/pets/rex").unwrap();
        assert_eq!(captures.get("person").map(String::as_str), Some("ada"));
        assert_eq!(captures.get("pet").map(String::as_str), Some("rex"));
        assert!(p.matches("/people/ada/pets").is_none());
    }

    #[test]
    fn catch_all_captures_remainder() {
        let p = pattern("/files/{*path}");
        let captures = p.matches("/files/a/b/c.txt").unwrap();
        assert_eq!(captures.get("path").map(String::as_str), Some("a/b/c.txt"));

        let empty = p.matches("/files").unwrap();
        assert_eq!(empty.get("path").map(String::as_str), Some(""));

        let unnamed = pattern("/static/*");
        assert_eq!(unnamed.matches("/static/css/site.css"), Some(PathVariables::new()));
    }

    #[test]
    fn root_pattern() {
        let p = pattern("/");
        assert!(p.matches("/").is_some());
        assert!(p.matches("/anything").is_none());
    }

    #[test]
    fn invalid_templates_are_rejected() {
        assert!(matches!(
            RoutePattern::parse("ping"),
            Err(PatternError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            RoutePattern::parse("/a/{}"),
            Err(PatternError::EmptyVariable(_))
        ));
        assert!(matches!(
            RoutePattern::parse("/a/{id"),
            Err(PatternError::UnterminatedVariable(_))
        ));
        assert!(matches!(
            RoutePattern::parse("/a/{*rest}/b"),
            Err(PatternError::CatchAllNotLast(_))
        ));
    }

    #[test]
    fn literals_outrank_variables_and_catch_alls() {
        let literal = pattern("/users/me");
        let variable = pattern("/users/{id}");
        let catch_all = pattern("/{*rest}");

        assert_eq!(literal.cmp_specificity(&variable), Ordering::Less);
        assert_eq!(variable.cmp_specificity(&literal), Ordering::Greater);
        assert_eq!(variable.cmp_specificity(&catch_all), Ordering::Less);
        assert_eq!(literal.cmp_specificity(&literal.clone()), Ordering::Equal);
    }

    #[test]
    fn trailing_catch_all_ranks_below_shorter_pattern() {
        let exact = pattern("/api");
        let tail = pattern("/api/{*rest}");
        let longer = pattern("/api/v1");

        assert_eq!(exact.cmp_specificity(&tail), Ordering::Less);
        assert_eq!(tail.cmp_specificity(&exact), Ordering::Greater);
        assert_eq!(longer.cmp_specificity(&exact), Ordering::Less);
    }
}
