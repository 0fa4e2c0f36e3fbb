//! Method + path dispatch.
//!
//! Routes are matched in registration order and the first match wins.
//! Path templates use `{name}` segments, captured into [`PathParams`].
//!
//! When a path matches but the method does not, the router reports the
//! methods that would have matched so the server can answer `405` with an
//! `Allow` header.
//!
//! ```rust
//! use rampart_core::{empty_response, handler_fn};
//! use rampart_server::{Resolution, Router};
//! use http::{Method, StatusCode};
//!
//! let mut router = Router::new();
//! router.add(Method::GET, "/users/{id}", handler_fn(|_| async {
//!     empty_response(StatusCode::OK)
//! }));
//!
//! match router.resolve(&Method::GET, "/users/42") {
//!     Resolution::Matched(m) => assert_eq!(m.params().get("id"), Some("42")),
//!     _ => unreachable!(),
//! }
//! assert!(matches!(router.resolve(&Method::POST, "/users/42"), Resolution::MethodNotAllowed(_)));
//! assert!(matches!(router.resolve(&Method::GET, "/orders"), Resolution::NotFound));
//! ```

use std::fmt;

use http::Method;
use rampart_core::{BoxedHandler, PathParams};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

struct Route {
    method: Method,
    pattern: String,
    segments: Vec<PathSegment>,
    handler: BoxedHandler,
}

impl Route {
    fn match_path(&self, path: &str) -> Option<PathParams> {
        let mut actual = path.split('/').filter(|s| !s.is_empty());
        let mut params = Vec::new();

        for segment in &self.segments {
            let part = actual.next()?;
            match segment {
                PathSegment::Literal(expected) if expected != part => return None,
                PathSegment::Literal(_) => {}
                PathSegment::Param(name) => params.push((name.clone(), part.to_string())),
            }
        }

        if actual.next().is_some() {
            return None;
        }
        Some(params.into_iter().collect())
    }
}

/// A resolved route.
pub struct RouteMatch {
    handler: BoxedHandler,
    pattern: String,
    params: PathParams,
}

impl RouteMatch {
    /// The composed handler registered for the route.
    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// The registered path template.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Captured path parameters.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Splits the match into its handler and parameters.
    pub fn into_parts(self) -> (BoxedHandler, PathParams) {
        (self.handler, self.params)
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`Router::resolve`].
#[derive(Debug)]
pub enum Resolution {
    /// A route matched method and path.
    Matched(RouteMatch),
    /// The path matched only under other methods, listed here.
    MethodNotAllowed(Vec<Method>),
    /// Nothing matched the path.
    NotFound,
}

/// HTTP request router.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` and `pattern`.
    pub fn add(&mut self, method: Method, pattern: impl Into<String>, handler: BoxedHandler) {
        let pattern = pattern.into();
        tracing::debug!(method = %method, pattern = %pattern, "Registering route");
        self.routes.push(Route {
            segments: parse_segments(&pattern),
            method,
            pattern,
            handler,
        });
    }

    /// Number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if a route is registered for `method` and `pattern`.
    #[must_use]
    pub fn has_route(&self, method: &Method, pattern: &str) -> bool {
        self.routes
            .iter()
            .any(|route| route.method == *method && route.pattern == pattern)
    }

    /// Resolves a request line.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.match_path(path) else {
                continue;
            };
            if route.method == *method {
                return Resolution::Matched(RouteMatch {
                    handler: route.handler.clone(),
                    pattern: route.pattern.clone(),
                    params,
                });
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed(allowed)
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| format!("{} {}", r.method, r.pattern)))
            .finish()
    }
}
