//! In-memory test client.

use std::future::Future;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use rampart_core::{handler_fn, BoxedHandler, Handler, Request, RequestContext, Response};
use serde::Serialize;
use std::sync::Arc;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Drives a [`Handler`] without binding a socket.
///
/// Anything that implements `Handler` works: a composed endpoint, a
/// guard layer, or a whole `Server`, whose dispatch then runs routing,
/// timeouts and problem rendering exactly as it would over TCP.
///
/// Every request is sent with a [`RequestContext`] attached, as the server
/// does, so stages that read the request ID or cancellation token behave
/// the same when driven directly.
///
/// # Example
///
/// ```ignore
/// use rampart_test::TestClient;
///
/// let client = TestClient::new(server);
/// let response = client.get("/users/42").send().await;
/// response.assert_status(StatusCode::OK);
/// ```
#[must_use]
#[derive(Clone)]
pub struct TestClient {
    handler: BoxedHandler,
    default_headers: HeaderMap,
}

impl TestClient {
    /// Wraps a handler.
    pub fn new(handler: impl Handler) -> Self {
        Self::from_shared(Arc::new(handler))
    }

    /// Wraps an already shared handler.
    pub fn from_shared(handler: BoxedHandler) -> Self {
        Self {
            handler,
            default_headers: HeaderMap::new(),
        }
    }

    /// Wraps an async function.
    pub fn from_fn<F, Fut>(func: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::from_shared(handler_fn(func))
    }

    /// Adds a header sent with every request. Per-request headers win.
    ///
    /// # Errors
    ///
    /// Returns `TestError::InvalidHeader` for an invalid name or value.
    pub fn with_default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, TestError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| TestError::InvalidHeader(e.to_string()))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| TestError::InvalidHeader(e.to_string()))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest {
            client: self,
            builder: TestRequestBuilder::new(method, uri),
        }
    }

    /// Sends a prepared request.
    pub async fn execute(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let mut request = request.into_request();
        if RequestContext::from_request(&request).is_none() {
            request.extensions_mut().insert(RequestContext::new());
        }
        for (name, value) in &self.default_headers {
            if !request.headers().contains_key(name) {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }

        let response = self.handler.call(request).await;
        TestResponse::from_http(response).await
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A request builder bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    /// Use [`try_send`](Self::try_send) to handle those cases.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build and read failures.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.execute(request).await
    }
}
