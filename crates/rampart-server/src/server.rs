//! HTTP server implementation.
//!
//! Built on hyper's HTTP/1 connection driver and tokio. Each request goes
//! through the same steps:
//!
//! 1. Collect the body, bounded by `max_body_bytes` (413 beyond it)
//! 2. Attach a [`RequestContext`] whose token is cancelled on timeout,
//!    on client disconnect, and when shutdown gives up waiting
//! 3. Resolve the route (404 / 405 problems otherwise) and attach the
//!    captured [`PathParams`]
//! 4. Run the composed endpoint handler under the request timeout (504)
//!
//! [`Server::dispatch`] runs steps 2-4 on an already-buffered request,
//! which is what tests use to exercise the full pipeline without sockets.
//!
//! # Example
//!
//! ```rust,ignore
//! use rampart_server::{Endpoint, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .endpoint(Endpoint::get("/health", health_handler))
//!         .build();
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::header::ALLOW;
use http::{HeaderValue, Method};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rampart_core::{
    problem_response, BoxFuture, ErrorCatalog, Handler, Request, RequestContext, Response,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config::{ServerConfig, ServerConfigBuilder};
use crate::endpoint::{Endpoint, EndpointGroup};
use crate::error::ServerError;
use crate::router::{Resolution, Router};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Rampart HTTP server.
///
/// Cheap to clone; clones share the routing table.
#[derive(Debug, Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ServerConfig,
    catalog: ErrorCatalog,
    router: Router,
    /// Parent of every request token; cancelled when shutdown gives up.
    requests: CancellationToken,
}

impl Server {
    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Returns the catalog used for transport-level problems.
    #[must_use]
    pub fn catalog(&self) -> &ErrorCatalog {
        &self.inner.catalog
    }

    /// Returns the routing table.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Runs the server until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config()
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config().http_addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` fires.
    ///
    /// In-flight connections are then asked to finish gracefully. If they
    /// are still running after the shutdown timeout, their request tokens
    /// are cancelled and the server returns anyway.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, routes = self.router().route_count(), "Server listening");

        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = self.clone();
                            let shutdown = shutdown.clone();
                            tracker.spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::debug!(remote_addr = %remote_addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let shutdown_timeout = self.config().shutdown_timeout();
        tracing::info!(
            timeout_ms = u64::try_from(shutdown_timeout.as_millis()).unwrap_or(u64::MAX),
            active_connections = tracker.active_connections(),
            "Waiting for connections to close"
        );

        if tokio::time::timeout(shutdown_timeout, tracker.drain()).await.is_err() {
            tracing::warn!(
                active_connections = tracker.active_connections(),
                "Shutdown timeout reached, cancelling in-flight requests"
            );
            self.inner.requests.cancel();
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = self.clone();

        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = server.clone();
            async move { Ok::<_, Infallible>(server.handle(request).await) }
        });

        let conn = http1::Builder::new()
            .keep_alive(self.config().keep_alive())
            .serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote_addr = %remote_addr, "Closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Handles a request straight off the wire.
    async fn handle(&self, request: http::Request<Incoming>) -> Response {
        let (parts, body) = request.into_parts();
        let limit = self.config().max_body_bytes();

        let bytes = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::debug!(path = %parts.uri.path(), limit, "Request body too large");
                let catalog = self.catalog();
                return problem_response(&catalog.payload_too_large(&parts.uri, limit), catalog);
            }
            Err(e) => {
                tracing::debug!(path = %parts.uri.path(), error = %e, "Failed to read request body");
                let catalog = self.catalog();
                return problem_response(&catalog.bad_request(&parts.uri), catalog);
            }
        };

        self.dispatch(Request::from_parts(parts, bytes)).await
    }

    /// Routes and runs a buffered request through its endpoint pipeline.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        let token = self.inner.requests.child_token();
        let ctx = match request.extensions_mut().remove::<RequestContext>() {
            Some(ctx) => ctx.with_cancellation(token.clone()),
            None => RequestContext::new().with_cancellation(token.clone()),
        };
        request.extensions_mut().insert(ctx);

        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let handler = match self.router().resolve(&method, &path) {
            Resolution::Matched(route) => {
                let (handler, params) = route.into_parts();
                request.extensions_mut().insert(params);
                handler
            }
            Resolution::MethodNotAllowed(allowed) => {
                tracing::debug!(method = %method, path = %path, "Method not allowed");
                return method_not_allowed(self.catalog(), &path, &allowed);
            }
            Resolution::NotFound => {
                tracing::debug!(method = %method, path = %path, "No route");
                let catalog = self.catalog();
                return problem_response(&catalog.not_found(&path), catalog);
            }
        };

        // Dropping this future (client went away) cancels the token too.
        let disconnect = token.clone().drop_guard();
        let timeout = self.config().request_timeout();
        let response = match tokio::time::timeout(timeout, handler.call(request)).await {
            Ok(response) => response,
            Err(_) => {
                token.cancel();
                tracing::warn!(method = %method, path = %path, "Request timed out");
                let catalog = self.catalog();
                problem_response(&catalog.gateway_timeout(&path, timeout), catalog)
            }
        };
        disconnect.disarm();
        response
    }
}

impl Handler for Server {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let server = self.clone();
        Box::pin(async move { server.dispatch(request).await })
    }
}

fn method_not_allowed(catalog: &ErrorCatalog, path: &str, allowed: &[Method]) -> Response {
    let mut response = problem_response(&catalog.method_not_allowed(path), catalog);

    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

/// Builder for configuring and creating a [`Server`].
///
/// Endpoints are composed with the catalog when [`build`](Self::build)
/// is called, so the catalog may be set in any order.
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: ServerConfigBuilder,
    catalog: ErrorCatalog,
    endpoints: EndpointGroup,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all settings with `config`.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = ServerConfigBuilder::new()
            .http_addr(config.http_addr())
            .shutdown_timeout(config.shutdown_timeout())
            .request_timeout(config.request_timeout())
            .max_body_bytes(config.max_body_bytes())
            .keep_alive(config.keep_alive());
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config = self.config.http_addr(addr);
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.shutdown_timeout(timeout);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.request_timeout(timeout);
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config = self.config.max_body_bytes(limit);
        self
    }

    /// Sets the error catalog used for guard, interceptor and transport
    /// problems.
    #[must_use]
    pub fn catalog(mut self, catalog: ErrorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Registers an endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Registers every endpoint of a group, in order.
    #[must_use]
    pub fn endpoints(mut self, group: EndpointGroup) -> Self {
        self.endpoints.extend(group);
        self
    }

    /// Composes the endpoints and builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        let mut router = Router::new();
        for endpoint in &self.endpoints {
            router.add(
                endpoint.method().clone(),
                endpoint.path(),
                endpoint.compose(&self.catalog),
            );
        }

        Server {
            inner: Arc::new(Inner {
                config: self.config.build(),
                catalog: self.catalog,
                router,
                requests: CancellationToken::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use rampart_core::{empty_response, handler_fn};
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    async fn json_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn server() -> Server {
        Server::builder()
            .endpoint(Endpoint::get(
                "/items/{id}",
                handler_fn(|request: Request| async move {
                    let params = request.extensions().get::<rampart_core::PathParams>().cloned();
                    let ctx = RequestContext::from_request(&request).is_some();
                    let status = match (params, ctx) {
                        (Some(p), true) if p.get("id") == Some("7") => StatusCode::OK,
                        _ => StatusCode::EXPECTATION_FAILED,
                    };
                    empty_response(status)
                }),
            ))
            .endpoint(Endpoint::delete(
                "/items/{id}",
                handler_fn(|_| async { empty_response(StatusCode::NO_CONTENT) }),
            ))
            .build()
    }

    #[test]
    fn test_builder_defaults() {
        let server = Server::builder().build();
        assert_eq!(server.config(), &ServerConfig::default());
        assert_eq!(server.catalog(), &ErrorCatalog::default());
        assert_eq!(server.router().route_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_attaches_context_and_params() {
        let response = server().dispatch(request(Method::GET, "/items/7")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found_problem() {
        let response = server().dispatch(request(Method::GET, "/nothing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = json_of(response).await;
        assert_eq!(json["code"], "404-01");
        assert_eq!(json["instance"], "/nothing");
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_with_allow() {
        let response = server().dispatch(request(Method::PUT, "/items/7")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, DELETE");

        let json = json_of(response).await;
        assert_eq!(json["status"], 405);
        assert_eq!(json["code"], "405-01");
        assert_eq!(json["type"], "https://docs.rampart.dev/errors/method-not-allowed.md");
        assert_eq!(json["instance"], "/items/7");
    }

    #[tokio::test]
    async fn test_timeout_cancels_request() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
        let server = Server::builder()
            .request_timeout(Duration::from_millis(20))
            .endpoint(Endpoint::get(
                "/slow",
                handler_fn(move |request: Request| {
                    let token = RequestContext::from_request(&request)
                        .unwrap()
                        .cancellation()
                        .clone();
                    let tx = tx.lock().unwrap().take();
                    async move {
                        token.cancelled().await;
                        if let Some(tx) = tx {
                            let _ = tx.send(());
                        }
                        empty_response(StatusCode::OK)
                    }
                }),
            ))
            .build();

        let handle = tokio::spawn({
            let server = server.clone();
            async move { server.dispatch(request(Method::GET, "/slow")).await }
        });

        let response = handle.await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = json_of(response).await;
        assert_eq!(json["title"], "Gateway Timeout");
        assert_eq!(json["code"], "504-01");
        assert_eq!(json["detail"], "The request did not complete within 20ms");
        // The handler future was dropped, so its sender was dropped too.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();

        let server = Server::builder()
            .max_body_bytes(8)
            .endpoint(Endpoint::post(
                "/tea",
                handler_fn(|_| async { empty_response(StatusCode::IM_A_TEAPOT) }),
            ))
            .build();
        let serving = tokio::spawn(server.serve(listener, shutdown.clone()));

        let small = raw_request(addr, "POST /tea HTTP/1.1\r\nHost: x\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}").await;
        assert!(small.starts_with("HTTP/1.1 418"), "{small}");

        let large = raw_request(addr, "POST /tea HTTP/1.1\r\nHost: x\r\nContent-Length: 16\r\nConnection: close\r\n\r\n0123456789abcdef").await;
        assert!(large.starts_with("HTTP/1.1 413"), "{large}");
        assert!(large.contains("application/problem+json"));
        assert!(large.contains(r#""code":"413-01""#), "{large}");

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
    }

    async fn raw_request(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }
}
