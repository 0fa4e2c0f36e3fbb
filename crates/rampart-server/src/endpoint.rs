//! Endpoints and endpoint groups.
//!
//! An [`Endpoint`] is a method, a path and a handler, plus the guards,
//! interceptors and middleware attached to it. [`Endpoint::compose`] turns
//! it into the executable chain:
//!
//! ```text
//! interceptors → middleware → guards → handler
//! ```
//!
//! Middleware is kept as its own list rather than folded into the handler
//! when attached, so guards added later still sit closest to the handler.
//!
//! [`EndpointGroup`] applies the same transformation to every member. All
//! group transforms consume the group and return a new one.
//!
//! ```rust
//! use rampart_core::{empty_response, handler_fn};
//! use rampart_server::{Endpoint, EndpointGroup};
//! use http::StatusCode;
//!
//! let ok = handler_fn(|_| async { empty_response(StatusCode::OK) });
//! let group: EndpointGroup = vec![
//!     Endpoint::get("/users", ok.clone()),
//!     Endpoint::get("/accounts", ok),
//! ]
//! .into_iter()
//! .collect();
//!
//! let api = group.with_prefix("/api");
//! assert_eq!(api.paths(), vec!["/api/users", "/api/accounts"]);
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;
use rampart_core::{BoxedHandler, ErrorCatalog};
use rampart_middleware::{
    apply, Guard, GuardStack, InterceptorStack, Middleware, RequestInterceptor, SharedGuard,
    SharedInterceptor, SharedMiddleware,
};

/// A logical endpoint.
#[derive(Clone)]
pub struct Endpoint {
    method: Method,
    path: String,
    handler: BoxedHandler,
    guards: GuardStack,
    interceptors: InterceptorStack,
    middleware: Vec<SharedMiddleware>,
}

impl Endpoint {
    /// Creates an endpoint with empty stacks.
    pub fn new(method: Method, path: impl Into<String>, handler: BoxedHandler) -> Self {
        Self {
            method,
            path: path.into(),
            handler,
            guards: GuardStack::new(),
            interceptors: InterceptorStack::new(),
            middleware: Vec::new(),
        }
    }

    /// A `GET` endpoint.
    pub fn get(path: impl Into<String>, handler: BoxedHandler) -> Self {
        Self::new(Method::GET, path, handler)
    }

    /// A `POST` endpoint.
    pub fn post(path: impl Into<String>, handler: BoxedHandler) -> Self {
        Self::new(Method::POST, path, handler)
    }

    /// A `PUT` endpoint.
    pub fn put(path: impl Into<String>, handler: BoxedHandler) -> Self {
        Self::new(Method::PUT, path, handler)
    }

    /// A `PATCH` endpoint.
    pub fn patch(path: impl Into<String>, handler: BoxedHandler) -> Self {
        Self::new(Method::PATCH, path, handler)
    }

    /// A `DELETE` endpoint.
    pub fn delete(path: impl Into<String>, handler: BoxedHandler) -> Self {
        Self::new(Method::DELETE, path, handler)
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The undecorated handler.
    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    /// Attached guards.
    pub fn guards(&self) -> &GuardStack {
        &self.guards
    }

    /// Attached interceptors.
    pub fn interceptors(&self) -> &InterceptorStack {
        &self.interceptors
    }

    /// Attached middleware, first applied first.
    pub fn middleware(&self) -> &[SharedMiddleware] {
        &self.middleware
    }

    /// Prepends `prefix` to the path.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.path = format!("{prefix}{}", self.path);
        }
        self
    }

    /// Appends a guard.
    pub fn with_guard(mut self, guard: impl Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Appends a request interceptor.
    pub fn with_request_interceptor(mut self, interceptor: impl RequestInterceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Wraps the handler with `middleware`; earlier middleware stays inside.
    pub fn with_middleware(self, middleware: impl Middleware) -> Self {
        self.with_shared_middleware(Arc::new(middleware))
    }

    fn with_shared_guard(mut self, guard: SharedGuard) -> Self {
        self.guards.push_shared(guard);
        self
    }

    fn with_shared_interceptor(mut self, interceptor: SharedInterceptor) -> Self {
        self.interceptors.push_shared(interceptor);
        self
    }

    fn with_shared_middleware(mut self, middleware: SharedMiddleware) -> Self {
        if !middleware.is_noop() {
            self.middleware.push(middleware);
        }
        self
    }

    /// Builds the executable handler chain.
    ///
    /// Guard and interceptor errors are written as problems from `catalog`.
    pub fn compose(&self, catalog: &ErrorCatalog) -> BoxedHandler {
        let guarded = self.guards.layer(Arc::clone(&self.handler), catalog);
        let wrapped = apply(&self.middleware, guarded);
        self.interceptors.layer(wrapped, catalog)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("guards", &self.guards.len())
            .field("interceptors", &self.interceptors.len())
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// An ordered collection of endpoints.
#[derive(Debug, Clone, Default)]
pub struct EndpointGroup {
    endpoints: Vec<Endpoint>,
}

impl EndpointGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an endpoint.
    pub fn push(&mut self, endpoint: Endpoint) {
        self.endpoints.push(endpoint);
    }

    /// Appends every endpoint of `other`, keeping order.
    pub fn merge(mut self, other: EndpointGroup) -> Self {
        self.endpoints.extend(other.endpoints);
        self
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Iterates over the endpoints in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }

    /// The path of every endpoint, in order.
    pub fn paths(&self) -> Vec<&str> {
        self.endpoints.iter().map(Endpoint::path).collect()
    }

    /// Prepends `prefix` to every path. An empty prefix changes nothing.
    pub fn with_prefix(self, prefix: &str) -> Self {
        self.map(|endpoint| endpoint.with_prefix(prefix))
    }

    /// Appends `guard` to every endpoint's guard stack.
    pub fn with_guard(self, guard: impl Guard) -> Self {
        if guard.is_noop() {
            return self;
        }
        let guard: SharedGuard = Arc::new(guard);
        self.map(|endpoint| endpoint.with_shared_guard(Arc::clone(&guard)))
    }

    /// Appends `interceptor` to every endpoint's interceptor stack.
    pub fn with_request_interceptor(self, interceptor: impl RequestInterceptor) -> Self {
        if interceptor.is_noop() {
            return self;
        }
        let interceptor: SharedInterceptor = Arc::new(interceptor);
        self.map(|endpoint| endpoint.with_shared_interceptor(Arc::clone(&interceptor)))
    }

    /// Wraps every endpoint's handler with `middleware`.
    pub fn with_middleware(self, middleware: impl Middleware) -> Self {
        if middleware.is_noop() {
            return self;
        }
        let middleware: SharedMiddleware = Arc::new(middleware);
        self.map(|endpoint| endpoint.with_shared_middleware(Arc::clone(&middleware)))
    }

    fn map(self, f: impl FnMut(Endpoint) -> Endpoint) -> Self {
        Self {
            endpoints: self.endpoints.into_iter().map(f).collect(),
        }
    }
}

impl Extend<Endpoint> for EndpointGroup {
    fn extend<I: IntoIterator<Item = Endpoint>>(&mut self, iter: I) {
        self.endpoints.extend(iter);
    }
}

impl FromIterator<Endpoint> for EndpointGroup {
    fn from_iter<I: IntoIterator<Item = Endpoint>>(iter: I) -> Self {
        Self {
            endpoints: iter.into_iter().collect(),
        }
    }
}

impl From<Endpoint> for EndpointGroup {
    fn from(endpoint: Endpoint) -> Self {
        Self {
            endpoints: vec![endpoint],
        }
    }
}

impl IntoIterator for EndpointGroup {
    type Item = Endpoint;
    type IntoIter = std::vec::IntoIter<Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.into_iter()
    }
}

impl<'a> IntoIterator for &'a EndpointGroup {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.iter()
    }
}
