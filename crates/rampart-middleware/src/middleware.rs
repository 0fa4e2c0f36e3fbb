//! Core middleware trait and types.
//!
//! Middleware wraps a handler: it receives the request together with a
//! [`Next`] that runs everything behind it, and may act before and after
//! calling it, or answer without calling it at all.
//!
//! [`wrap`] turns a middleware and a handler into a new handler. Applying
//! several middleware with [`apply`] wraps them in call order, so the first
//! one applied ends up innermost.
//!
//! # Example
//!
//! ```
//! use rampart_core::{BoxFuture, Request, Response};
//! use rampart_middleware::{Middleware, Next};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let response = next.run(request).await;
//!             tracing::debug!(elapsed_us = start.elapsed().as_micros() as u64, "timed");
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use rampart_core::{BoxFuture, BoxedHandler, Handler, Request, Response};

/// A type-erased, shareable middleware.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// The core middleware trait.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once
/// - Middleware returns exactly one response
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, usually by delegating to `next`.
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response>;

    /// Returns `true` when wrapping with this middleware changes nothing.
    fn is_noop(&self) -> bool {
        false
    }
}

impl<M: Middleware> Middleware for Option<M> {
    fn name(&self) -> &'static str {
        self.as_ref().map_or("none", Middleware::name)
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
        match self {
            Some(middleware) => middleware.process(request, next),
            None => Box::pin(next.run(request)),
        }
    }

    fn is_noop(&self) -> bool {
        self.as_ref().map_or(true, Middleware::is_noop)
    }
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
        (**self).process(request, next)
    }

    fn is_noop(&self) -> bool {
        (**self).is_noop()
    }
}

/// The rest of the chain behind a middleware.
///
/// Consumed by [`Next::run`], so it can only be invoked once.
pub struct Next {
    handler: BoxedHandler,
}

impl Next {
    /// Creates a `Next` that invokes `handler`.
    pub fn new(handler: BoxedHandler) -> Self {
        Self { handler }
    }

    /// Invokes the rest of the chain.
    pub async fn run(self, request: Request) -> Response {
        self.handler.call(request).await
    }
}

/// A middleware that can be created from an async function.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
        Box::pin((self.func)(request, next))
    }
}

/// Creates a named middleware from an async function.
///
/// ```
/// use rampart_middleware::middleware_fn;
///
/// let tagged = middleware_fn("tag", |request, next| async move {
///     let mut response = next.run(request).await;
///     response.headers_mut().insert("x-tag", http::HeaderValue::from_static("1"));
///     response
/// });
/// ```
pub fn middleware_fn<F, Fut>(name: &'static str, func: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnMiddleware::new(name, func)
}

/// Wraps `next` with `middleware`.
///
/// A no-op middleware returns `next` unchanged.
pub fn wrap(middleware: SharedMiddleware, next: BoxedHandler) -> BoxedHandler {
    if middleware.is_noop() {
        return next;
    }
    Arc::new(Wrapped { middleware, next })
}

/// Wraps `handler` with each middleware in order; the first is innermost.
pub fn apply<'a, I>(middleware: I, handler: BoxedHandler) -> BoxedHandler
where
    I: IntoIterator<Item = &'a SharedMiddleware>,
{
    middleware
        .into_iter()
        .fold(handler, |inner, m| wrap(Arc::clone(m), inner))
}

struct Wrapped {
    middleware: SharedMiddleware,
    next: BoxedHandler,
}

impl Handler for Wrapped {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let middleware = Arc::clone(&self.middleware);
        let next = Next::new(Arc::clone(&self.next));
        Box::pin(async move { middleware.process(request, next).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderValue, StatusCode};
    use rampart_core::{empty_response, handler_fn};
    use std::sync::Mutex;

    fn request() -> Request {
        http::Request::builder().uri("/test").body(Bytes::new()).unwrap()
    }

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> SharedMiddleware {
        let log = Arc::clone(log);
        Arc::new(middleware_fn(name, move |request, next| {
            log.lock().unwrap().push(name);
            next.run(request)
        }))
    }

    #[tokio::test]
    async fn test_middleware_name() {
        let mw = middleware_fn("test", |request, next: Next| next.run(request));
        assert_eq!(mw.name(), "test");
        assert_eq!(None::<FnMiddleware<fn(Request, Next) -> BoxFuture<'static, Response>>>.name(), "none");
    }

    #[tokio::test]
    async fn test_absent_middleware_returns_next_unchanged() {
        let handler = handler_fn(|_request| async { empty_response(StatusCode::OK) });
        let none: SharedMiddleware = Arc::new(None::<FnMiddleware<fn(Request, Next) -> BoxFuture<'static, Response>>>);

        let wrapped = wrap(none, Arc::clone(&handler));
        assert!(Arc::ptr_eq(&wrapped, &handler));
    }

    #[tokio::test]
    async fn test_first_applied_is_innermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![recording("first", &log), recording("second", &log)];
        let handler = apply(
            &chain,
            handler_fn(|_request| async { empty_response(StatusCode::OK) }),
        );

        let response = handler.call(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let called = Arc::new(Mutex::new(false));
        let inner_called = Arc::clone(&called);
        let handler = wrap(
            Arc::new(middleware_fn("deny", |_request, _next| async {
                empty_response(StatusCode::SERVICE_UNAVAILABLE)
            })),
            handler_fn(move |_request| {
                *inner_called.lock().unwrap() = true;
                async { empty_response(StatusCode::OK) }
            }),
        );

        let response = handler.call(request()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn test_middleware_post_processes_response() {
        let handler = wrap(
            Arc::new(middleware_fn("tag", |request, next: Next| async move {
                let mut response = next.run(request).await;
                response
                    .headers_mut()
                    .insert("x-tag", HeaderValue::from_static("seen"));
                response
            })),
            handler_fn(|_request| async { empty_response(StatusCode::OK) }),
        );

        let response = handler.call(request()).await;
        assert_eq!(response.headers()["x-tag"], "seen");
    }
}
