//! Stock pipeline units.
//!
//! - [`request_id`] - Attach and echo a request ID (interceptor + middleware)
//! - [`access_log`] - One structured log line per request
//! - [`bearer`] - Reject requests without an acceptable bearer token

pub mod access_log;
pub mod bearer;
pub mod request_id;

pub use access_log::AccessLogMiddleware;
pub use bearer::BearerTokenGuard;
pub use request_id::{RequestIdInterceptor, RequestIdMiddleware, REQUEST_ID_HEADER};
