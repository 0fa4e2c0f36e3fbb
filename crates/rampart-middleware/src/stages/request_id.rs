//! Request ID propagation.
//!
//! [`RequestIdInterceptor`] makes sure every request carries a
//! [`RequestContext`], optionally adopting an incoming `x-request-id`
//! header. [`RequestIdMiddleware`] echoes the ID on the response so clients
//! can correlate their requests with server logs.
//!
//! UUID v7 is used for generated IDs because it is time-ordered.

use http::HeaderValue;
use rampart_core::{BoxFuture, Request, RequestContext, RequestId, Response};

use crate::interceptor::RequestInterceptor;
use crate::middleware::{Middleware, Next};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Interceptor that attaches a request ID.
///
/// # Behavior
///
/// 1. If trusted, parse the `x-request-id` header
/// 2. If the request already has a [`RequestContext`], adopt the parsed ID
///    into it (keeping its cancellation token)
/// 3. Otherwise insert a new context with the parsed or a fresh ID
#[derive(Debug, Clone, Default)]
pub struct RequestIdInterceptor {
    /// Whether to trust incoming request ID headers.
    ///
    /// Typically `false` for external traffic and `true` for
    /// service-to-service calls.
    trust_incoming: bool,
}

impl RequestIdInterceptor {
    /// Creates an interceptor that ignores incoming `x-request-id` headers.
    ///
    /// An existing [`RequestContext`] is left untouched; otherwise a context
    /// with a fresh ID is attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an interceptor that trusts incoming `x-request-id` headers.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| RequestId::parse(s).ok())
    }
}

impl RequestInterceptor for RequestIdInterceptor {
    fn intercept(&self, mut request: Request) -> BoxFuture<'_, anyhow::Result<Request>> {
        let incoming = self.extract_request_id(&request);

        match request.extensions_mut().get_mut::<RequestContext>() {
            Some(ctx) => {
                if let Some(id) = incoming {
                    ctx.set_request_id(id);
                }
            }
            None => {
                let ctx = RequestContext::with_request_id(incoming.unwrap_or_default());
                request.extensions_mut().insert(ctx);
            }
        }

        Box::pin(async move { Ok(request) })
    }
}

/// Middleware that stamps `x-request-id` on every response.
///
/// Requests that reach it without a [`RequestContext`] get a fresh one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(&'a self, mut request: Request, next: Next) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = match RequestContext::from_request(&request) {
                Some(ctx) => ctx.request_id(),
                None => {
                    let ctx = RequestContext::new();
                    let id = ctx.request_id();
                    request.extensions_mut().insert(ctx);
                    id
                }
            };

            let mut response = next.run(request).await;

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}
