//! Compiled route table.
//!
//! # Responsibilities
//! - Hold the route definitions of one snapshot
//! - Reject ambiguous definitions at compile time
//! - Resolve (method, path) to a route, a 405, or a 404
//!
//! # Design Decisions
//! - Immutable after compilation (shared without locks)
//! - Ambiguity is a compile error, never a runtime tie-break
//! - HEAD falls back to the GET route when no HEAD route exists

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use axum::http::Method;
use serde::Serialize;

use super::matcher::PathTrie;
use super::pattern::{split_request_path, PathPattern};
use super::KNOWN_METHODS;
use crate::security::capability::CapabilitySet;

/// One entry of `routes.yaml` after parsing.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: String,
    pub required_capabilities: CapabilitySet,
    /// Skip credential enforcement for this route.
    pub public: bool,
    /// Per-route handler timeout; `None` uses the environment default.
    pub timeout: Option<Duration>,
}

impl RouteDefinition {
    pub fn new(method: Method, pattern: PathPattern, handler: impl Into<String>) -> Self {
        Self {
            method,
            pattern,
            handler: handler.into(),
            required_capabilities: CapabilitySet::new(),
            public: false,
            timeout: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.required_capabilities = capabilities;
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Two definitions with the same method and pattern shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("route conflict: {method} {pattern_a} and {method} {pattern_b} have the same shape")]
pub struct RouteConflict {
    pub method: Method,
    pub pattern_a: String,
    pub pattern_b: String,
}

/// Path parameters extracted from a matched request, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathParams(BTreeMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// Position of the route in the table (stable for the table's lifetime).
    pub index: usize,
    pub route: &'a RouteDefinition,
    pub params: PathParams,
}

/// Outcome of [`RouteTable::lookup`].
#[derive(Debug)]
pub enum RouteLookup<'a> {
    Matched(RouteMatch<'a>),
    /// The path matches under other methods only.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// Conflict-checked index over route definitions.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
    by_method: HashMap<Method, PathTrie>,
}

impl RouteTable {
    /// Compile definitions into a table, failing on the first shape conflict.
    pub fn compile(definitions: Vec<RouteDefinition>) -> Result<Self, RouteConflict> {
        let mut by_method: HashMap<Method, PathTrie> = HashMap::new();

        for (index, def) in definitions.iter().enumerate() {
            let trie = by_method.entry(def.method.clone()).or_default();
            if let Err(existing) = trie.insert(&def.pattern, index) {
                return Err(RouteConflict {
                    method: def.method.clone(),
                    pattern_a: definitions[existing].pattern.to_string(),
                    pattern_b: def.pattern.to_string(),
                });
            }
        }

        Ok(Self {
            routes: definitions,
            by_method,
        })
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn get(&self, index: usize) -> Option<&RouteDefinition> {
        self.routes.get(index)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve a request to the most specific route.
    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup<'_> {
        let Some(segments) = split_request_path(path) else {
            return RouteLookup::NotFound;
        };

        if let Some(found) = self.find(method, &segments) {
            return RouteLookup::Matched(found);
        }
        if *method == Method::HEAD {
            if let Some(found) = self.find(&Method::GET, &segments) {
                return RouteLookup::Matched(found);
            }
        }

        // A GET route also answers HEAD.
        let allowed: Vec<Method> = KNOWN_METHODS
            .iter()
            .filter(|m| {
                self.path_matches(m, &segments)
                    || (**m == Method::HEAD && self.path_matches(&Method::GET, &segments))
            })
            .cloned()
            .collect();

        if allowed.is_empty() {
            return RouteLookup::NotFound;
        }
        RouteLookup::MethodNotAllowed { allowed }
    }

    fn path_matches(&self, method: &Method, segments: &[&str]) -> bool {
        self.by_method
            .get(method)
            .is_some_and(|trie| trie.matches(segments))
    }

    fn find(&self, method: &Method, segments: &[&str]) -> Option<RouteMatch<'_>> {
        let trie = self.by_method.get(method)?;
        let (index, values) = trie.find(segments)?;
        let route = &self.routes[index];
        let params = route.pattern.param_names().zip(values).collect();
        Some(RouteMatch {
            index,
            route,
            params,
        })
    }
}
