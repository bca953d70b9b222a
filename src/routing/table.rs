//! Routing table and its atomically published snapshot.
//!
//! # Responsibilities
//! - Keep patterns ordered most-specific-first
//! - Hold the mapping groups registered under each pattern
//! - Resolve (path, method) to a handler plus captured variables
//! - Publish new table versions without blocking readers
//!
//! # Design Decisions
//! - `RoutingTable` is immutable; registration builds a new one and swaps it in
//! - Identical templates share one entry; each registration appends a group
//! - First registered wins on (pattern, method) conflicts
//! - A pattern that matches without a usable method is a miss, not a 405

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Method;

use crate::http::handler::Handler;
use crate::routing::pattern::{PathVariables, PatternError, RoutePattern};

/// Method selector for a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    /// Matches every method not claimed by an exact entry.
    Any,
    Exact(Method),
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Exact(method)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::Any => f.write_str("ANY"),
            RouteMethod::Exact(method) => f.write_str(method.as_str()),
        }
    }
}

/// One registration's method → handler entries.
#[derive(Clone, Default)]
pub struct MappingGroup {
    entries: Vec<(RouteMethod, Arc<dyn Handler>)>,
}

impl MappingGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: impl Into<RouteMethod>, handler: impl Handler) -> Self {
        self.entries.push((method.into(), Arc::new(handler)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn methods(&self) -> impl Iterator<Item = &RouteMethod> {
        self.entries.iter().map(|(method, _)| method)
    }

    fn exact(&self, method: &Method) -> Option<&Arc<dyn Handler>> {
        self.entries.iter().find_map(|(m, handler)| match m {
            RouteMethod::Exact(m) if m == method => Some(handler),
            _ => None,
        })
    }

    fn any(&self) -> Option<&Arc<dyn Handler>> {
        self.entries
            .iter()
            .find_map(|(m, handler)| (*m == RouteMethod::Any).then_some(handler))
    }
}

impl fmt::Debug for MappingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods()).finish()
    }
}

/// A pattern and every group registered under it.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pattern: RoutePattern,
    groups: Vec<MappingGroup>,
}

impl RouteEntry {
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn groups(&self) -> &[MappingGroup] {
        &self.groups
    }

    /// Whether an earlier group already claims `method`.
    fn claims(&self, method: &RouteMethod) -> bool {
        self.groups
            .iter()
            .any(|group| group.methods().any(|m| m == method))
    }

    fn select(&self, method: &Method) -> Option<&Arc<dyn Handler>> {
        self.groups
            .iter()
            .find_map(|group| group.exact(method))
            .or_else(|| self.groups.iter().find_map(MappingGroup::any))
    }
}

/// Outcome of a successful resolution.
#[derive(Clone)]
pub struct RouteMatch {
    pub handler: Arc<dyn Handler>,
    pub variables: PathVariables,
    /// Template of the matched pattern, for logging.
    pub pattern: Arc<str>,
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

/// Why a request did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMiss {
    NoPattern,
    /// The pattern matched but declares neither the method nor ANY.
    MethodNotRegistered { pattern: Arc<str> },
}

/// Immutable, specificity-ordered routing table.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: Vec<Arc<RouteEntry>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// New table with `group` registered under `pattern`.
    ///
    /// An identical template gets the group appended; otherwise the pattern is
    /// inserted before the first strictly less specific entry, so ties keep
    /// registration order.
    pub fn with_group(&self, pattern: RoutePattern, group: MappingGroup) -> RoutingTable {
        let mut entries = self.entries.clone();

        if let Some(slot) = entries
            .iter_mut()
            .find(|entry| entry.pattern.template() == pattern.template())
        {
            let mut entry = RouteEntry::clone(&**slot);
            entry.groups.push(group);
            *slot = Arc::new(entry);
        } else {
            let position = entries
                .iter()
                .position(|entry| pattern.cmp_specificity(&entry.pattern).is_lt())
                .unwrap_or(entries.len());
            entries.insert(
                position,
                Arc::new(RouteEntry {
                    pattern,
                    groups: vec![group],
                }),
            );
        }

        RoutingTable { entries }
    }

    /// Resolve against the first pattern (in table order) matching `path`.
    pub fn resolve(&self, path: &str, method: &Method) -> Result<RouteMatch, RouteMiss> {
        for entry in &self.entries {
            let Some(variables) = entry.pattern.matches(path) else {
                continue;
            };
            return match entry.select(method) {
                Some(handler) => Ok(RouteMatch {
                    handler: Arc::clone(handler),
                    variables,
                    pattern: entry.pattern.shared_template(),
                }),
                None => Err(RouteMiss::MethodNotRegistered {
                    pattern: entry.pattern.shared_template(),
                }),
            };
        }
        Err(RouteMiss::NoPattern)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter().map(Arc::as_ref)
    }

    /// Templates in resolution order.
    pub fn templates(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.pattern.template().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, template: &str) -> Option<&RouteEntry> {
        self.entries()
            .find(|entry| entry.pattern.template() == template)
    }
}

/// Shared handle publishing routing table snapshots.
///
/// Readers take one snapshot per request; writers copy, modify and swap.
#[derive(Debug, Default)]
pub struct Routes {
    current: ArcSwap<RoutingTable>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single handler under `pattern` for `method`.
    pub fn register(
        &self,
        pattern: &str,
        method: impl Into<RouteMethod>,
        handler: impl Handler,
    ) -> Result<(), PatternError> {
        self.register_group(pattern, MappingGroup::new().with(method, handler))
    }

    /// Register one mapping group under `pattern`.
    pub fn register_group(&self, pattern: &str, group: MappingGroup) -> Result<(), PatternError> {
        let compiled = RoutePattern::parse(pattern)?;
        let methods: Vec<RouteMethod> = group.methods().cloned().collect();

        let previous = self
            .current
            .rcu(|table| table.with_group(compiled.clone(), group.clone()));

        if let Some(entry) = previous.entry(compiled.template()) {
            for method in methods.iter().filter(|m| entry.claims(m)) {
                tracing::warn!(
                    route = %compiled,
                    method = %method,
                    "Route already registered for method, earlier handler wins"
                );
            }
        }

        tracing::debug!(route = %compiled, methods = ?methods, "Route registered");
        Ok(())
    }

    /// Current table snapshot.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.current.load_full()
    }

    pub fn resolve(&self, path: &str, method: &Method) -> Result<RouteMatch, RouteMiss> {
        self.current.load().resolve(path, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::handler_fn;
    use crate::http::request::Request;
    use crate::http::response::Response;
    use http::{HeaderMap, Uri};

    fn text(body: &'static str) -> impl Handler {
        handler_fn(move |_| Ok(Response::ok_text(body)))
    }

    fn body_of(routes: &Routes, path: &'static str, method: Method) -> Option<String> {
        let matched = routes.resolve(path, &method).ok()?;
        let request = Request::new(method, Uri::from_static(path), HeaderMap::new());
        let response = matched.handler.handle(&request).ok()?;
        Some(String::from_utf8_lossy(response.body()).into_owned())
    }

    #[test]
    fn exact_method_resolves_with_variables() {
        let routes = Routes::new();
        routes
            .register("/people/{person}", Method::GET, text("person"))
            .unwrap();

        let matched = routes.resolve("/people/ada", &Method::GET).unwrap();
        assert_eq!(matched.variables.get("person").map(String::as_str), Some("ada"));
        assert_eq!(&*matched.pattern, "/people/{person}");
    }

    #[test]
    fn unmatched_path_is_a_miss() {
        let routes = Routes::new();
        routes.register("/a", Method::GET, text("a")).unwrap();
        assert_eq!(
            routes.resolve("/b", &Method::GET).unwrap_err(),
            RouteMiss::NoPattern
        );
    }

    #[test]
    fn any_accepts_every_method() {
        let routes = Routes::new();
        routes.register("/anything", RouteMethod::Any, text("any")).unwrap();
        for method in [Method::GET, Method::POST, Method::DELETE, Method::PATCH] {
            assert_eq!(body_of(&routes, "/anything", method).as_deref(), Some("any"));
        }
    }

    #[test]
    fn exact_method_beats_any_regardless_of_order() {
        let routes = Routes::new();
        routes.register("/items", RouteMethod::Any, text("any")).unwrap();
        routes.register("/items", Method::POST, text("post")).unwrap();

        assert_eq!(body_of(&routes, "/items", Method::POST).as_deref(), Some("post"));
        assert_eq!(body_of(&routes, "/items", Method::GET).as_deref(), Some("any"));
    }

    #[test]
    fn first_registered_wins_on_duplicate() {
        let routes = Routes::new();
        routes.register("/dup", Method::GET, text("first")).unwrap();
        routes.register("/dup", Method::GET, text("second")).unwrap();

        let snapshot = routes.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries().next().map(|e| e.groups().len()), Some(2));
        assert_eq!(body_of(&routes, "/dup", Method::GET).as_deref(), Some("first"));
    }

    #[test]
    fn matching_pattern_without_method_is_a_miss() {
        let routes = Routes::new();
        routes.register("/only-get", Method::GET, text("get")).unwrap();
        routes.register("/{*rest}", RouteMethod::Any, text("fallback")).unwrap();

        assert!(matches!(
            routes.resolve("/only-get", &Method::POST),
            Err(RouteMiss::MethodNotRegistered { .. })
        ));
    }

    #[test]
    fn specific_patterns_are_tried_first() {
        let routes = Routes::new();
        routes.register("/{*rest}", RouteMethod::Any, text("catch-all")).unwrap();
        routes.register("/users/{id}", Method::GET, text("user")).unwrap();
        routes.register("/users/me", Method::GET, text("me")).unwrap();

        assert_eq!(
            routes.snapshot().templates(),
            vec!["/users/me", "/users/{id}", "/{*rest}"]
        );
        assert_eq!(body_of(&routes, "/users/me", Method::GET).as_deref(), Some("me"));
        assert_eq!(body_of(&routes, "/users/7", Method::GET).as_deref(), Some("user"));
        assert_eq!(body_of(&routes, "/other", Method::GET).as_deref(), Some("catch-all"));
    }

    #[test]
    fn equally_specific_patterns_keep_registration_order() {
        let routes = Routes::new();
        routes.register("/{a}/x", Method::GET, text("first")).unwrap();
        routes.register("/{b}/x", Method::GET, text("second")).unwrap();
        assert_eq!(routes.snapshot().templates(), vec!["/{a}/x", "/{b}/x"]);
        assert_eq!(body_of(&routes, "/q/x", Method::GET).as_deref(), Some("first"));
    }

    #[test]
    fn group_registers_several_methods() {
        let routes = Routes::new();
        routes
            .register_group(
                "/orders",
                MappingGroup::new()
                    .with(Method::GET, text("list"))
                    .with(Method::POST, text("create")),
            )
            .unwrap();

        assert_eq!(body_of(&routes, "/orders", Method::GET).as_deref(), Some("list"));
        assert_eq!(body_of(&routes, "/orders", Method::POST).as_deref(), Some("create"));
    }

    #[test]
    fn old_snapshot_is_unaffected_by_registration() {
        let routes = Routes::new();
        routes.register("/a", Method::GET, text("a")).unwrap();
        let before = routes.snapshot();
        routes.register("/b", Method::GET, text("b")).unwrap();

        assert!(before.resolve("/b", &Method::GET).is_err());
        assert!(routes.resolve("/b", &Method::GET).is_ok());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let routes = Routes::new();
        assert!(routes.register("no-slash", Method::GET, text("x")).is_err());
        assert!(routes.snapshot().is_empty());
    }
}
