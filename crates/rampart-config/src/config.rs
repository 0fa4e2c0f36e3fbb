//! Configuration types.
//!
//! [`RampartConfig`] is the root document. Every section rejects unknown
//! fields and falls back to defaults for fields it does not mention.

use std::net::SocketAddr;
use std::time::Duration;

use rampart_core::{ErrorCatalog, TypeScheme, DEFAULT_DOCS_BASE_URL};
use rampart_server::{
    Server, ServerBuilder, ServerConfig, DEFAULT_HTTP_ADDR, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
use rampart_telemetry::{create_env_filter, LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete Rampart service configuration.
///
/// # Example
///
/// ```
/// use rampart_config::RampartConfig;
///
/// let config = RampartConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.errors.docs_base_url, "https://docs.rampart.dev/errors/");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct RampartConfig {
    /// HTTP transport settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Problem-details settings.
    #[serde(default)]
    pub errors: ErrorsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RampartConfig {
    /// Local development preset: pretty debug logs on localhost.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: ServerSettings {
                http_addr: "127.0.0.1:8080".to_string(),
                shutdown_timeout_secs: 5,
                ..ServerSettings::default()
            },
            errors: ErrorsConfig::default(),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// A server builder preloaded with the transport settings and the
    /// error catalog from this configuration.
    #[must_use]
    pub fn server_builder(&self) -> ServerBuilder {
        Server::builder()
            .config(self.server.to_server_config())
            .catalog(self.errors.catalog())
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.errors.validate()?;
        self.logging.validate()
    }
}

/// The `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Bind address, `host:port`.
    pub http_addr: String,

    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,

    /// Per-request deadline in milliseconds.
    pub request_timeout_ms: u64,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerSettings {
    /// Converts into the transport's [`ServerConfig`].
    #[must_use]
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::builder()
            .http_addr(self.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(self.shutdown_timeout_secs))
            .request_timeout(Duration::from_millis(self.request_timeout_ms))
            .max_body_bytes(self.max_body_bytes)
            .build()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.http_addr),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// The `[errors]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Base URL that problem `type` URIs are built from.
    pub docs_base_url: String,

    /// `markdown` appends `.md` to each slug, `url` does not.
    pub type_scheme: TypeScheme,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            docs_base_url: DEFAULT_DOCS_BASE_URL.to_string(),
            type_scheme: TypeScheme::Markdown,
        }
    }
}

impl ErrorsConfig {
    /// Builds the error catalog described by this section.
    ///
    /// ```
    /// use rampart_config::ErrorsConfig;
    ///
    /// let catalog = ErrorsConfig::default().catalog();
    /// assert_eq!(
    ///     catalog.bad_request("/x").type_url(),
    ///     "https://docs.rampart.dev/errors/bad-request.md"
    /// );
    /// ```
    #[must_use]
    pub fn catalog(&self) -> ErrorCatalog {
        ErrorCatalog::new(&self.docs_base_url).with_scheme(self.type_scheme)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.docs_base_url.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "errors.docs_base_url",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `rampart_server=debug,info`.
    pub level: String,

    /// `json` or `pretty`.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Converts into the subscriber settings used by `init_logging`.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        base.with_level(self.level.clone())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        create_env_filter(&self.level)
            .map(|_| ())
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))
    }
}
