//! # Rampart Core
//!
//! Core types and traits for the Rampart request pipeline.
//!
//! This crate provides the foundational types used throughout Rampart:
//!
//! - [`DetailedError`] - RFC 9457 problem details with copy-on-write builders
//! - [`ErrorCatalog`] - Canonical problem constructors bound to a docs base URL
//! - [`RequestContext`] - Per-request context carrying the request ID and cancellation
//! - [`Handler`] - The transport-facing handler trait
//! - [`error_response`] - Normalizes any pipeline error into a problem response

#![doc(html_root_url = "https://docs.rs/rampart-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod context;
mod handler;
mod problem;
mod response;
mod types;

pub use catalog::{
    ErrorCatalog, ErrorKind, InstancePath, TypeScheme, Violation, DEFAULT_DOCS_BASE_URL,
    VIOLATIONS_KEY,
};
pub use context::{PathParams, RequestContext, RequestId};
pub use handler::{handler_fn, BoxFuture, BoxedHandler, FnHandler, Handler};
pub use problem::{
    is_protected, DetailedError, Extension, ExtensionValue, ProblemError, PROTECTED_FIELDS,
};
pub use response::{empty_response, error_response, json_response, problem_response, to_problem};
pub use types::{Request, Response, APPLICATION_JSON, APPLICATION_PROBLEM_JSON};
