//! Typed configuration for Rampart services.
//!
//! Configuration is layered: built-in defaults, then a TOML or JSON file,
//! then `PREFIX__SECTION__KEY` environment variables. Unknown fields are
//! rejected at every layer that parses a document.
//!
//! # Example
//!
//! ```no_run
//! use rampart_config::ConfigLoader;
//!
//! # fn main() -> Result<(), rampart_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("rampart.toml")?
//!     .with_env_prefix("RAMPART")
//!     .load()?;
//!
//! let catalog = config.errors.catalog();
//! let server = config.server.to_server_config();
//! # let _ = (catalog, server);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! max_body_bytes = 1048576
//!
//! [errors]
//! docs_base_url = "https://docs.rampart.dev/errors/"
//! type_scheme = "markdown"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/rampart-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{ErrorsConfig, LoggingConfig, RampartConfig, ServerSettings};
pub use error::ConfigError;
pub use loader::ConfigLoader;
