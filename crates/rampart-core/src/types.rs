//! HTTP request and response types used throughout the pipeline.

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type seen by every pipeline stage.
///
/// The body is fully buffered by the transport before dispatch.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by every pipeline stage.
pub type Response = http::Response<Full<Bytes>>;

/// Content type for JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type for RFC 9457 problem documents.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";
