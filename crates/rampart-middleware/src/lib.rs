//! # Rampart Middleware
//!
//! The three kinds of pipeline units Rampart composes around a handler.
//!
//! ```text
//! Request → Interceptors → Middleware → Guards → Handler
//!                              ↓
//! Response ←───────────────────┘
//! ```
//!
//! | Unit                   | Receives     | Can answer? | Can fail? | Composition       |
//! |------------------------|--------------|-------------|-----------|-------------------|
//! | [`RequestInterceptor`] | owned request | no         | yes       | pipelined         |
//! | [`Middleware`]         | request + [`Next`] | yes   | no        | wraps the handler |
//! | [`Guard`]              | borrowed request | yes     | yes       | first stop wins   |
//!
//! Every unit has a closure adapter ([`interceptor_fn`], [`middleware_fn`],
//! [`guard_fn`]) and `Option<T>` implements each trait as a no-op when
//! `None`, so optional units can be passed around without special cases.
//!
//! Errors returned by guards and interceptors are written as problem
//! documents through [`rampart_core::error_response`].

#![doc(html_root_url = "https://docs.rs/rampart-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod guard;
pub mod interceptor;
pub mod middleware;
pub mod stages;

pub use error::PipelineError;
pub use guard::{guard_fn, FnGuard, Guard, GuardResult, GuardStack, SharedGuard};
pub use interceptor::{
    interceptor_fn, FnInterceptor, InterceptorStack, RequestInterceptor, SharedInterceptor,
};
pub use middleware::{apply, middleware_fn, wrap, FnMiddleware, Middleware, Next, SharedMiddleware};
