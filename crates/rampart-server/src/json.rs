//! Typed JSON handlers.
//!
//! [`json_handler`] bridges the untyped [`Handler`] interface to a business
//! function over typed values:
//!
//! 1. The body is decoded into `T`. An empty body decodes as JSON `null`,
//!    so `()` and `Option<T>` accept bodiless requests. A decode failure
//!    answers with the catalog's `bad_request` problem and the function is
//!    never called.
//! 2. The function receives the decoded body and the request parts.
//! 3. A [`DetailedError`](rampart_core::DetailedError) is written verbatim;
//!    any other error becomes the catalog's `server_error` problem.
//! 4. `Ok(Some(response))` is encoded as JSON with the response's status,
//!    `Ok(None)` answers `204 No Content`.
//!
//! ```rust
//! use rampart_core::ErrorCatalog;
//! use rampart_server::{json_handler, JsonResponse, RequestData};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct CreateUser { name: String }
//!
//! #[derive(Serialize)]
//! struct User { id: u64, name: String }
//!
//! let create = json_handler(&ErrorCatalog::default(), |data: RequestData<CreateUser>| async move {
//!     let user = User { id: 1, name: data.body.name };
//!     Ok(Some(JsonResponse::created(user)))
//! });
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::StatusCode;
use rampart_core::{
    empty_response, error_response, json_response, problem_response, BoxFuture, BoxedHandler,
    ErrorCatalog, Handler, PathParams, Request, RequestContext, Response,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A decoded request.
#[derive(Debug)]
pub struct RequestData<T> {
    /// The decoded body.
    pub body: T,
    /// Method, URI, headers and extensions of the request.
    pub parts: Parts,
}

impl<T> RequestData<T> {
    /// The request context attached by the server, if any.
    pub fn context(&self) -> Option<&RequestContext> {
        self.parts.extensions.get::<RequestContext>()
    }

    /// A path parameter captured by the router.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parts.extensions.get::<PathParams>()?.get(name)
    }

    /// A value attached to the request extensions by an interceptor.
    pub fn extension<E: Send + Sync + 'static>(&self) -> Option<&E> {
        self.parts.extensions.get::<E>()
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }
}

/// A typed response: a status and an optional JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse<R> {
    status: StatusCode,
    body: Option<R>,
}

impl<R> JsonResponse<R> {
    /// A response with `status` and `body`.
    pub const fn new(status: StatusCode, body: R) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// `200 OK` with `body`.
    pub const fn ok(body: R) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// `201 Created` with `body`.
    pub const fn created(body: R) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// A response with `status` and an empty body.
    pub const fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// The status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The body, if any.
    pub const fn body(&self) -> Option<&R> {
        self.body.as_ref()
    }
}

/// The result type of typed handler functions.
pub type JsonResult<R> = anyhow::Result<Option<JsonResponse<R>>>;

/// A [`Handler`] over a typed business function.
pub struct JsonHandler<T, R, F> {
    func: Arc<F>,
    catalog: ErrorCatalog,
    _types: PhantomData<fn(T) -> R>,
}

impl<T, R, F, Fut> Handler for JsonHandler<T, R, F>
where
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(RequestData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JsonResult<R>> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let func = Arc::clone(&self.func);
        let catalog = self.catalog.clone();

        Box::pin(async move {
            let (parts, body) = request.into_parts();

            let body = match decode::<T>(&body) {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(path = %parts.uri.path(), error = %e, "Rejecting undecodable body");
                    return problem_response(&catalog.bad_request(&parts.uri), &catalog);
                }
            };

            let uri = parts.uri.clone();
            match func(RequestData { body, parts }).await {
                Ok(Some(response)) => encode(response, &catalog, &uri),
                Ok(None) => empty_response(StatusCode::NO_CONTENT),
                Err(error) => error_response(&error, &catalog, &uri),
            }
        })
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> serde_json::Result<T> {
    if body.is_empty() {
        serde_json::from_slice(b"null")
    } else {
        serde_json::from_slice(body)
    }
}

fn encode<R: Serialize>(response: JsonResponse<R>, catalog: &ErrorCatalog, uri: &http::Uri) -> Response {
    let Some(body) = response.body else {
        return empty_response(response.status);
    };
    match json_response(response.status, &body) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(path = %uri.path(), error = %e, "Failed to encode response body");
            problem_response(&catalog.server_error(uri), catalog)
        }
    }
}

/// Wraps a typed business function as a [`BoxedHandler`].
///
/// Problems produced by the handler itself use `catalog`.
pub fn json_handler<T, R, F, Fut>(catalog: &ErrorCatalog, func: F) -> BoxedHandler
where
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(RequestData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JsonResult<R>> + Send + 'static,
{
    Arc::new(JsonHandler {
        func: Arc::new(func),
        catalog: catalog.clone(),
        _types: PhantomData,
    })
}
