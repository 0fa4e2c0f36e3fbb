//! Logging setup for Rampart services.
//!
//! Rampart crates log through `tracing`; this crate installs the subscriber
//! that formats those events. JSON output is the production default,
//! pretty output is meant for local development.
//!
//! ```rust,ignore
//! use rampart_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! ```

#![doc(html_root_url = "https://docs.rs/rampart-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
