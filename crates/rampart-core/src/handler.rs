//! Transport-facing handler trait.
//!
//! A [`Handler`] turns one [`Request`] into one [`Response`]. Everything the
//! pipeline composes (typed JSON handlers, guard layers, middleware
//! wrappers) ends up behind this single-method trait, shared as a
//! [`BoxedHandler`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::types::{Request, Response};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased, shareable handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Handles a single request.
///
/// The transport invokes `call` exactly once per request, and the returned
/// response is written exactly once.
pub trait Handler: Send + Sync + 'static {
    /// Processes the request.
    fn call(&self, request: Request) -> BoxFuture<'static, Response>;
}

/// A handler created from an async function.
///
/// # Example
///
/// ```
/// use rampart_core::{handler_fn, empty_response};
/// use http::StatusCode;
///
/// let handler = handler_fn(|_request| async { empty_response(StatusCode::NO_CONTENT) });
/// ```
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    /// Wraps `func`.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        Box::pin((self.func)(request))
    }
}

/// Boxes an async function as a [`BoxedHandler`].
pub fn handler_fn<F, Fut>(func: F) -> BoxedHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(FnHandler::new(func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::empty_response;
    use bytes::Bytes;
    use http::StatusCode;

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = handler_fn(|request: Request| async move {
            if request.uri().path() == "/ok" {
                empty_response(StatusCode::OK)
            } else {
                empty_response(StatusCode::NOT_FOUND)
            }
        });

        let ok = handler
            .call(http::Request::builder().uri("/ok").body(Bytes::new()).unwrap())
            .await;
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = handler
            .call(http::Request::builder().uri("/nope").body(Bytes::new()).unwrap())
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_boxed_handler_is_shareable() {
        let handler = handler_fn(|_request: Request| async { empty_response(StatusCode::ACCEPTED) });
        let shared = Arc::clone(&handler);

        let response = tokio_test::block_on(shared.call(http::Request::new(Bytes::new())));
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(Arc::strong_count(&handler), 2);
    }
}
