//! Layered configuration loading.
//!
//! Layers apply in order, later ones overriding earlier ones:
//! 1. Built-in defaults (or a preset)
//! 2. A TOML or JSON file
//! 3. Environment variables named `PREFIX__SECTION__KEY`
//!
//! Validation runs once, after the last layer.

use std::env;
use std::fs;
use std::path::Path;

use rampart_core::TypeScheme;
use rampart_telemetry::LogFormat;

use crate::{ConfigError, RampartConfig};

/// Builds a [`RampartConfig`] from defaults, files and the environment.
///
/// # Example
///
/// ```no_run
/// use rampart_config::ConfigLoader;
///
/// # fn main() -> Result<(), rampart_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("rampart.toml")?
///     .with_env_prefix("RAMPART")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: RampartConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl ConfigLoader {
    /// Creates a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the built-in defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = RampartConfig::default();
        self
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = RampartConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = RampartConfig::production();
        self
    }

    /// Loads a configuration file, choosing the parser by extension.
    ///
    /// Fields the file leaves out take their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension, or fails to parse (unknown fields included).
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.config = Self::parse_file(&content, path)?;
        self.file_loaded = true;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in the given format
    /// (`"toml"` or `"json"`).
    ///
    /// # Example
    ///
    /// ```
    /// use rampart_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [server]
    ///     http_addr = "127.0.0.1:3000"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Self::parse_str(content, format)?;
        self.file_loaded = true;
        Ok(self)
    }

    /// Sets the environment variable prefix for overrides.
    ///
    /// With prefix `RAMPART`:
    /// - `RAMPART__SERVER__HTTP_ADDR=0.0.0.0:9000`
    /// - `RAMPART__ERRORS__TYPE_SCHEME=url`
    /// - `RAMPART__LOGGING__LEVEL=debug`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file from the current directory or its parents into
    /// the process environment. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DotenvError` if a `.env` file exists but is
    /// malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Loaded .env file");
                Ok(self)
            }
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `true` once a file or string layer has been applied.
    #[must_use]
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or the final
    /// configuration is invalid.
    pub fn load(mut self) -> Result<RampartConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without env overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> RampartConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<RampartConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some(format @ ("toml" | "json")) => Self::parse_str(content, format),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn parse_str(content: &str, format: &str) -> Result<RampartConfig, ConfigError> {
        match format.to_lowercase().as_str() {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(format.to_string())),
        }
    }

    fn apply_env_overrides<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let scoped = format!("{prefix}__");
        for (key, value) in vars {
            if key.starts_with(&scoped) {
                self.apply_env_var(&key, &value, &scoped)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, scoped: &str) -> Result<(), ConfigError> {
        let Some(path) = key.strip_prefix(scoped) else {
            return Ok(());
        };
        let parts: Vec<&str> = path.split("__").collect();

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => {
                self.config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                self.config.server.request_timeout_ms = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                self.config.server.max_body_bytes = parse_number(key, value)?;
            }

            ["ERRORS", "DOCS_BASE_URL"] => {
                self.config.errors.docs_base_url = value.to_string();
            }
            ["ERRORS", "TYPE_SCHEME"] => {
                self.config.errors.type_scheme = match value.to_lowercase().as_str() {
                    "markdown" => TypeScheme::Markdown,
                    "url" => TypeScheme::Url,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'markdown' or 'url'",
                        ))
                    }
                };
            }

            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected 'json' or 'pretty'"))?;
            }

            _ => {
                tracing::warn!(var = key, "Ignoring unknown configuration variable");
            }
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}
