//! Guards.
//!
//! A [`Guard`] inspects a request just before the handler runs and decides
//! whether processing continues. It answers with one of three outcomes:
//!
//! - `Ok(None)`: continue to the next guard, then the handler
//! - `Ok(Some(response))`: stop and write `response` as-is
//! - `Err(error)`: stop and write `error` as a problem document
//!
//! A [`GuardStack`] evaluates guards in insertion order and stops at the
//! first one that does not continue. Later guards are never invoked.
//!
//! # Example
//!
//! ```
//! use rampart_core::empty_response;
//! use rampart_middleware::{guard_fn, GuardStack};
//! use http::StatusCode;
//!
//! let stack = GuardStack::new()
//!     .with(guard_fn(|_request| async { Ok(None) }))
//!     .with(guard_fn(|_request| async {
//!         Ok(Some(empty_response(StatusCode::IM_A_TEAPOT)))
//!     }));
//!
//! assert_eq!(stack.len(), 2);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use rampart_core::{error_response, BoxFuture, BoxedHandler, ErrorCatalog, Handler, Request, Response};

use crate::error::ensure_active;

/// Outcome of a guard check.
pub type GuardResult = anyhow::Result<Option<Response>>;

/// A type-erased, shareable guard.
pub type SharedGuard = Arc<dyn Guard>;

/// A short-circuiting pre-handler check.
pub trait Guard: Send + Sync + 'static {
    /// Checks the request.
    fn check<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, GuardResult>;

    /// Returns `true` when this guard can never stop a request.
    ///
    /// Stacks skip no-op guards instead of storing them.
    fn is_noop(&self) -> bool {
        false
    }
}

impl<G: Guard> Guard for Option<G> {
    fn check<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, GuardResult> {
        match self {
            Some(guard) => guard.check(request),
            None => Box::pin(async { Ok(None) }),
        }
    }

    fn is_noop(&self) -> bool {
        self.as_ref().map_or(true, Guard::is_noop)
    }
}

impl<G: Guard + ?Sized> Guard for Arc<G> {
    fn check<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, GuardResult> {
        (**self).check(request)
    }

    fn is_noop(&self) -> bool {
        (**self).is_noop()
    }
}

/// A guard created from an async function.
pub struct FnGuard<F> {
    func: F,
}

impl<F, Fut> Guard for FnGuard<F>
where
    F: Fn(&Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GuardResult> + Send + 'static,
{
    fn check<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, GuardResult> {
        Box::pin((self.func)(request))
    }
}

/// Creates a guard from an async function.
///
/// The function borrows the request only while building its future, so
/// anything the future needs must be copied out first.
pub fn guard_fn<F, Fut>(func: F) -> FnGuard<F>
where
    F: Fn(&Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GuardResult> + Send + 'static,
{
    FnGuard { func }
}

/// An ordered sequence of guards.
#[derive(Clone, Default)]
pub struct GuardStack {
    guards: Vec<SharedGuard>,
}

impl GuardStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a guard. No-op guards are dropped.
    pub fn push(&mut self, guard: impl Guard) {
        if !guard.is_noop() {
            self.guards.push(Arc::new(guard));
        }
    }

    /// Appends a shared guard. No-op guards are dropped.
    pub fn push_shared(&mut self, guard: SharedGuard) {
        if !guard.is_noop() {
            self.guards.push(guard);
        }
    }

    /// Returns the stack with `guard` appended.
    pub fn with(mut self, guard: impl Guard) -> Self {
        self.push(guard);
        self
    }

    /// Number of guards.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if the stack holds no guards.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Iterates over the guards in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedGuard> {
        self.guards.iter()
    }

    /// Evaluates the guards in order.
    ///
    /// Returns the first response or error produced, or `Ok(None)` when
    /// every guard lets the request through. A cancelled request stops
    /// before the next guard runs.
    pub async fn run(&self, request: &Request) -> GuardResult {
        for guard in &self.guards {
            ensure_active(request, "guard")?;
            if let Some(response) = guard.check(request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Puts the stack in front of `inner`.
    ///
    /// Guard errors are written as problems built from `catalog`. An empty
    /// stack returns `inner` unchanged.
    pub fn layer(&self, inner: BoxedHandler, catalog: &ErrorCatalog) -> BoxedHandler {
        if self.is_empty() {
            return inner;
        }
        Arc::new(Guarded {
            guards: Arc::new(self.clone()),
            inner,
            catalog: catalog.clone(),
        })
    }
}

impl Guard for GuardStack {
    fn check<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, GuardResult> {
        Box::pin(self.run(request))
    }

    fn is_noop(&self) -> bool {
        self.is_empty()
    }
}

impl fmt::Debug for GuardStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardStack")
            .field("len", &self.guards.len())
            .finish()
    }
}

impl<G: Guard> FromIterator<G> for GuardStack {
    fn from_iter<I: IntoIterator<Item = G>>(iter: I) -> Self {
        let mut stack = Self::new();
        for guard in iter {
            stack.push(guard);
        }
        stack
    }
}

struct Guarded {
    guards: Arc<GuardStack>,
    inner: BoxedHandler,
    catalog: ErrorCatalog,
}

impl Handler for Guarded {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let guards = Arc::clone(&self.guards);
        let inner = Arc::clone(&self.inner);
        let catalog = self.catalog.clone();

        Box::pin(async move {
            match guards.run(&request).await {
                Ok(None) => inner.call(request).await,
                Ok(Some(response)) => {
                    tracing::debug!(
                        path = %request.uri().path(),
                        status = response.status().as_u16(),
                        "Guard answered request"
                    );
                    response
                }
                Err(error) => error_response(&error, &catalog, &request),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use rampart_core::{empty_response, handler_fn, RequestContext};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> Request {
        http::Request::builder()
            .uri("/guarded")
            .body(Bytes::new())
            .unwrap()
    }

    fn counting(calls: &Arc<AtomicUsize>) -> impl Guard {
        let calls = Arc::clone(calls);
        guard_fn(move |_request| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
    }

    #[tokio::test]
    async fn test_empty_stack_continues() {
        assert!(GuardStack::new().run(&request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_absent_guards_are_skipped() {
        let stack = GuardStack::new()
            .with(None::<FnGuard<fn(&Request) -> std::future::Ready<GuardResult>>>)
            .with(None::<GuardStack>);

        assert!(stack.is_empty());
        assert!(stack.run(&request()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_response_short_circuits() {
        let spy = Arc::new(AtomicUsize::new(0));
        let stack = GuardStack::new()
            .with(guard_fn(|_request| async {
                Ok(Some(empty_response(StatusCode::IM_A_TEAPOT)))
            }))
            .with(counting(&spy));

        let response = stack.run(&request()).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(spy.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_short_circuits() {
        let spy = Arc::new(AtomicUsize::new(0));
        let stack = GuardStack::new()
            .with(guard_fn(|_request| async { Err(anyhow::anyhow!("denied")) }))
            .with(counting(&spy));

        let error = stack.run(&request()).await.unwrap_err();
        assert_eq!(error.to_string(), "denied");
        assert_eq!(spy.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_guards_run_when_continuing() {
        let spy = Arc::new(AtomicUsize::new(0));
        let stack: GuardStack = vec![counting(&spy), counting(&spy), counting(&spy)]
            .into_iter()
            .collect();

        assert!(stack.run(&request()).await.unwrap().is_none());
        assert_eq!(spy.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_request_stops_before_guard() {
        let spy = Arc::new(AtomicUsize::new(0));
        let stack = GuardStack::new().with(counting(&spy));

        let ctx = RequestContext::new();
        ctx.cancellation().cancel();
        let mut req = request();
        req.extensions_mut().insert(ctx);

        assert!(stack.run(&req).await.is_err());
        assert_eq!(spy.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_layer_writes_guard_error_as_problem() {
        let catalog = ErrorCatalog::default();
        let denied = catalog.forbidden("/guarded");
        let stack = GuardStack::new().with(guard_fn(move |_request| {
            let denied = denied.clone();
            async move { Err(denied.into()) }
        }));

        let handler = stack.layer(
            handler_fn(|_request| async { empty_response(StatusCode::OK) }),
            &catalog,
        );
        let response = handler.call(request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_layer_calls_inner_when_guards_pass() {
        let stack = GuardStack::new().with(guard_fn(|_request| async { Ok(None) }));
        let handler = stack.layer(
            handler_fn(|_request| async { empty_response(StatusCode::ACCEPTED) }),
            &ErrorCatalog::default(),
        );

        assert_eq!(handler.call(request()).await.status(), StatusCode::ACCEPTED);
    }
}
