//! # Rampart Server
//!
//! Endpoints, typed JSON handlers and the HTTP transport.
//!
//! - [`Endpoint`] / [`EndpointGroup`] - method + path + handler, with the
//!   guards, interceptors and middleware attached to them
//! - [`json_handler`] - typed request/response bridge over [`serde`]
//! - [`Router`] - method + path dispatch with `{param}` segments
//! - [`Server`] - hyper-based HTTP/1 server with body limits, request
//!   timeouts and graceful shutdown
//!
//! ## Request lifecycle
//!
//! ```text
//! Pending → Intercepted → Guarded → Decoded → Invoked → Written
//!    │           │           │         │         │
//!    └───────────┴───────────┴─────────┴─────────┴──→ Failed → Written
//! ```
//!
//! Every failure path ends in exactly one problem document written to the
//! client.

#![doc(html_root_url = "https://docs.rs/rampart-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
mod endpoint;
mod error;
mod json;
mod router;
mod server;
pub mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use endpoint::{Endpoint, EndpointGroup};
pub use error::ServerError;
pub use json::{json_handler, JsonHandler, JsonResponse, JsonResult, RequestData};
pub use router::{Resolution, RouteMatch, Router};
pub use server::{Server, ServerBuilder};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
