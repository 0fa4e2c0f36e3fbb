//! Request interceptors.
//!
//! A [`RequestInterceptor`] takes ownership of the request and hands back a
//! possibly modified one, typically with values attached to its extensions.
//! An [`InterceptorStack`] pipes the output of each interceptor into the
//! next, so later interceptors see what earlier ones attached.
//!
//! Interceptors cannot answer a request themselves. The only way to stop
//! the chain is to fail, and the first error aborts it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use rampart_core::{error_response, BoxFuture, BoxedHandler, ErrorCatalog, Handler, Request, Response};

use crate::error::ensure_active;

/// A type-erased, shareable interceptor.
pub type SharedInterceptor = Arc<dyn RequestInterceptor>;

/// Transforms or annotates a request before it reaches the handler.
pub trait RequestInterceptor: Send + Sync + 'static {
    /// Intercepts the request.
    fn intercept(&self, request: Request) -> BoxFuture<'_, anyhow::Result<Request>>;

    /// Returns `true` when this interceptor always passes requests through.
    fn is_noop(&self) -> bool {
        false
    }
}

impl<I: RequestInterceptor> RequestInterceptor for Option<I> {
    fn intercept(&self, request: Request) -> BoxFuture<'_, anyhow::Result<Request>> {
        match self {
            Some(interceptor) => interceptor.intercept(request),
            None => Box::pin(async move { Ok(request) }),
        }
    }

    fn is_noop(&self) -> bool {
        self.as_ref().map_or(true, RequestInterceptor::is_noop)
    }
}

impl<I: RequestInterceptor + ?Sized> RequestInterceptor for Arc<I> {
    fn intercept(&self, request: Request) -> BoxFuture<'_, anyhow::Result<Request>> {
        (**self).intercept(request)
    }

    fn is_noop(&self) -> bool {
        (**self).is_noop()
    }
}

/// An interceptor created from an async function.
pub struct FnInterceptor<F> {
    func: F,
}

impl<F, Fut> RequestInterceptor for FnInterceptor<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Request>> + Send + 'static,
{
    fn intercept(&self, request: Request) -> BoxFuture<'_, anyhow::Result<Request>> {
        Box::pin((self.func)(request))
    }
}

/// Creates an interceptor from an async function.
///
/// # Example
///
/// ```
/// use rampart_middleware::interceptor_fn;
///
/// #[derive(Clone)]
/// struct Tenant(String);
///
/// let tenant = interceptor_fn(|mut request| async move {
///     request.extensions_mut().insert(Tenant("acme".into()));
///     Ok(request)
/// });
/// ```
pub fn interceptor_fn<F, Fut>(func: F) -> FnInterceptor<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Request>> + Send + 'static,
{
    FnInterceptor { func }
}

/// An ordered, pipelined sequence of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorStack {
    interceptors: Vec<SharedInterceptor>,
}

impl InterceptorStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor. No-op interceptors are dropped.
    pub fn push(&mut self, interceptor: impl RequestInterceptor) {
        if !interceptor.is_noop() {
            self.interceptors.push(Arc::new(interceptor));
        }
    }

    /// Appends a shared interceptor. No-op interceptors are dropped.
    pub fn push_shared(&mut self, interceptor: SharedInterceptor) {
        if !interceptor.is_noop() {
            self.interceptors.push(interceptor);
        }
    }

    /// Returns the stack with `interceptor` appended.
    pub fn with(mut self, interceptor: impl RequestInterceptor) -> Self {
        self.push(interceptor);
        self
    }

    /// Number of interceptors.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if the stack holds no interceptors.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Iterates over the interceptors in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedInterceptor> {
        self.interceptors.iter()
    }

    /// Runs the request through every interceptor in order.
    pub async fn run(&self, mut request: Request) -> anyhow::Result<Request> {
        for interceptor in &self.interceptors {
            ensure_active(&request, "interceptor")?;
            request = interceptor.intercept(request).await?;
        }
        Ok(request)
    }

    /// Puts the stack in front of `inner`.
    ///
    /// Interceptor errors are written as problems built from `catalog`. An
    /// empty stack returns `inner` unchanged.
    pub fn layer(&self, inner: BoxedHandler, catalog: &ErrorCatalog) -> BoxedHandler {
        if self.is_empty() {
            return inner;
        }
        Arc::new(Intercepted {
            interceptors: Arc::new(self.clone()),
            inner,
            catalog: catalog.clone(),
        })
    }
}

impl RequestInterceptor for InterceptorStack {
    fn intercept(&self, request: Request) -> BoxFuture<'_, anyhow::Result<Request>> {
        Box::pin(self.run(request))
    }

    fn is_noop(&self) -> bool {
        self.is_empty()
    }
}

impl fmt::Debug for InterceptorStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorStack")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

impl<I: RequestInterceptor> FromIterator<I> for InterceptorStack {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        let mut stack = Self::new();
        for interceptor in iter {
            stack.push(interceptor);
        }
        stack
    }
}

struct Intercepted {
    interceptors: Arc<InterceptorStack>,
    inner: BoxedHandler,
    catalog: ErrorCatalog,
}

impl Handler for Intercepted {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let interceptors = Arc::clone(&self.interceptors);
        let inner = Arc::clone(&self.inner);
        let catalog = self.catalog.clone();

        Box::pin(async move {
            let uri = request.uri().clone();
            match interceptors.run(request).await {
                Ok(request) => inner.call(request).await,
                Err(error) => error_response(&error, &catalog, &uri),
            }
        })
    }
}
