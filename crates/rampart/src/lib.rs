//! # Rampart
//!
//! **Endpoint request pipelines with RFC 9457 problem details**
//!
//! Rampart wraps business handlers in three kinds of pipeline units and
//! renders every failure as an `application/problem+json` document:
//!
//! - **Request interceptors** transform or reject the request first
//! - **Middleware** wraps the rest of the chain and may answer directly
//! - **Guards** admit, answer or reject right before the handler
//! - **Typed JSON handlers** decode the body, call your function and
//!   encode the result
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rampart::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("rampart.toml")?
//!         .with_env_prefix("RAMPART")
//!         .load()?;
//!     init_logging(&config.logging.to_log_config())?;
//!
//!     let catalog = config.errors.catalog();
//!     let hello = json_handler(&catalog, |data: RequestData<()>| async move {
//!         Ok(Some(JsonResponse::ok(format!("hello {}", data.param("name").unwrap_or("world")))))
//!     });
//!
//!     config
//!         .server_builder()
//!         .endpoint(Endpoint::get("/hello/{name}", hello))
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Interceptors → Middleware → Guards → Handler
//!                              ↓
//! Response ←───────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/rampart/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use rampart_core as core;

// Re-export pipeline units
pub use rampart_middleware as middleware;

// Re-export endpoints and transport
pub use rampart_server as server;

// Re-export configuration
pub use rampart_config as config;

// Re-export logging setup
pub use rampart_telemetry as telemetry;

/// Commonly used types.
pub mod prelude {
    pub use rampart_core::{
        empty_response, error_response, json_response, problem_response, to_problem, BoxFuture,
        BoxedHandler, DetailedError, ErrorCatalog, ErrorKind, Handler, PathParams, Request,
        RequestContext, RequestId, Response, TypeScheme, Violation,
    };

    pub use rampart_middleware::stages::{
        AccessLogMiddleware, BearerTokenGuard, RequestIdInterceptor, RequestIdMiddleware,
    };
    pub use rampart_middleware::{
        guard_fn, interceptor_fn, middleware_fn, Guard, GuardResult, GuardStack,
        InterceptorStack, Middleware, Next, RequestInterceptor,
    };

    pub use rampart_server::{
        json_handler, Endpoint, EndpointGroup, JsonResponse, JsonResult, RequestData, Server,
        ServerConfig,
    };

    pub use rampart_config::{ConfigLoader, RampartConfig};

    pub use rampart_telemetry::{init_logging, LogConfig};
}
