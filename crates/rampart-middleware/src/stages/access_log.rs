//! Access logging middleware.
//!
//! Emits one structured event per request once the response is ready:
//!
//! - `request_id` - from the request's [`RequestContext`], when present
//! - `method` / `path` - the request line
//! - `status_code` - the response status
//! - `duration_ms` - time spent behind this middleware
//!
//! Server errors are logged at `warn`, everything else at `info`.

use std::time::Instant;

use rampart_core::{BoxFuture, Request, RequestContext, Response};

use crate::middleware::{Middleware, Next};

/// Middleware that logs every request through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct AccessLogMiddleware {
    /// Also log the request's query string.
    include_query: bool,
}

impl AccessLogMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes the query string in the logged path.
    #[must_use]
    pub fn with_query(mut self) -> Self {
        self.include_query = true;
        self
    }

    fn logged_path(&self, request: &Request) -> String {
        let uri = request.uri();
        match (self.include_query, uri.query()) {
            (true, Some(query)) => format!("{}?{}", uri.path(), query),
            _ => uri.path().to_string(),
        }
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().clone();
            let path = self.logged_path(&request);
            let request_id = RequestContext::from_request(&request)
                .map(|ctx| ctx.request_id().to_string())
                .unwrap_or_default();

            let response = next.run(request).await;

            let status = response.status();
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            if status.is_server_error() {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status_code = status.as_u16(),
                    duration_ms,
                    "Request failed"
                );
            } else {
                tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status_code = status.as_u16(),
                    duration_ms,
                    "Request completed"
                );
            }

            response
        })
    }
}
