//! Router core module - request path to operation resolution.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::spec::{ParamVec, PathTemplate, RouteMeta, Specification};
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Methods the gateway registers dispatch entries for.
///
/// Operations declared under any other method (HEAD, OPTIONS, TRACE) stay in
/// the specification but are never routable.
pub const REGISTERED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// Matching above this duration is logged as slow.
const SLOW_MATCH: Duration = Duration::from_millis(1);

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The operation bound to the matched dispatch entry
    pub route: Arc<RouteMeta>,
    /// Path parameters extracted from the URL (e.g., `{id}` → `{"id": "123"}`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics when a placeholder name repeats
    /// (e.g., `/org/{id}/user/{id}` returns the user id).
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// A template with the routes registered under it.
#[derive(Debug, Clone)]
struct RouteGroup {
    template: PathTemplate,
    routes: Vec<Arc<RouteMeta>>,
}

impl RouteGroup {
    fn route(&self, method: &Method) -> Option<&Arc<RouteMeta>> {
        self.routes.iter().find(|r| r.method == *method)
    }
}

/// Router over the registered dispatch entries.
///
/// Templates are tried in document order; the first one whose shape fits the
/// path *and* that has an entry for the method wins. A more specific template
/// declared later never takes precedence over an earlier generic one.
#[derive(Debug, Clone, Default)]
pub struct Router {
    groups: Vec<RouteGroup>,
    route_count: usize,
}

impl Router {
    /// Create a router from registered routes, given in document order.
    #[must_use]
    pub fn new(routes: Vec<Arc<RouteMeta>>) -> Self {
        let mut router = Self::default();
        for route in routes {
            router.insert(route);
        }

        if router.is_empty() {
            info!(routes_count = 0, "Routing table loaded with no routes");
        } else {
            let routes_summary: Vec<String> = router
                .routes()
                .take(10)
                .map(|r| format!("{} {}", r.method, r.path_pattern))
                .collect();
            info!(
                routes_count = router.route_count,
                templates = router.groups.len(),
                routes_summary = ?routes_summary,
                "Routing table loaded"
            );
        }
        router
    }

    /// Register a route after the existing ones.
    ///
    /// A route for an already registered (template, method) pair replaces the
    /// previous one in place and the replaced route is returned.
    pub fn insert(&mut self, route: Arc<RouteMeta>) -> Option<Arc<RouteMeta>> {
        let Some(group) = self
            .groups
            .iter_mut()
            .find(|g| g.template.as_str() == route.path_pattern)
        else {
            self.groups.push(RouteGroup {
                template: route.template.clone(),
                routes: vec![route],
            });
            self.route_count += 1;
            return None;
        };

        match group.routes.iter_mut().find(|r| r.method == route.method) {
            Some(existing) => Some(std::mem::replace(existing, route)),
            None => {
                group.routes.push(route);
                self.route_count += 1;
                None
            }
        }
    }

    /// Router over every operation of `spec` declared under a [`REGISTERED_METHODS`] method.
    #[must_use]
    pub fn from_spec(spec: &Specification) -> Self {
        Self::new(
            spec.operations()
                .filter(|op| REGISTERED_METHODS.contains(&op.method))
                .map(Arc::clone)
                .collect(),
        )
    }

    /// Registered routes in document order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteMeta>> {
        self.groups.iter().flat_map(|g| g.routes.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Match a request to a registered route.
    ///
    /// `path` is the raw request path without the query string; it is matched
    /// undecoded.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - If a matching route is found
    /// * `None` - If no route matches (results in 404)
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let match_start = Instant::now();

        let result = self.groups.iter().find_map(|group| {
            let params = group.template.matches(path)?;
            group.route(method).map(|route| RouteMatch {
                route: Arc::clone(route),
                path_params: params,
            })
        });

        let match_duration = match_start.elapsed();
        if match_duration > SLOW_MATCH {
            warn!(
                method = %method,
                path = %path,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        }

        match &result {
            Some(m) => debug!(
                method = %method,
                path = %path,
                route_pattern = %m.route.path_pattern,
                path_params = ?m.path_params,
                "Route matched"
            ),
            None => debug!(method = %method, path = %path, "No route matched"),
        }
        result
    }
}

/// Find the declared operation for a concrete path and method.
///
/// Same algorithm as [`Router::route`] but over every operation of the
/// specification, whatever its method.
#[must_use]
pub fn find_operation(spec: &Specification, method: &Method, path: &str) -> Option<RouteMatch> {
    spec.paths.iter().find_map(|item| {
        let params = item.template.matches(path)?;
        item.operation(method).map(|route| RouteMatch {
            route: Arc::clone(route),
            path_params: params,
        })
    })
}
