//! RFC 9457 problem details.
//!
//! This module provides [`DetailedError`], the structured error value that
//! every failure in the Rampart pipeline is normalized into before it is
//! written to the client.
//!
//! # Wire Format
//!
//! A `DetailedError` serializes to a single flat JSON object. Extension
//! members live at the same level as the six core fields:
//!
//! ```json
//! {
//!   "code": "400-01",
//!   "detail": "The request is invalid or malformed",
//!   "instance": "/tests",
//!   "status": 400,
//!   "title": "Bad Request",
//!   "type": "https://docs.rampart.dev/errors/bad-request.md",
//!   "trace": "abc"
//! }
//! ```
//!
//! The core fields can never be shadowed by an extension member sharing the
//! same key: they are always written from their own struct fields.
//!
//! # Copy-on-write
//!
//! Every `with_*` method takes `&self` and returns a new, independent value.
//! The receiver is never mutated.
//!
//! ```
//! use rampart_core::DetailedError;
//! use http::StatusCode;
//!
//! let base = DetailedError::new(StatusCode::BAD_REQUEST, "Bad Request");
//! let specific = base.with_detail("name is required");
//!
//! assert_eq!(base.detail(), "");
//! assert_eq!(specific.detail(), "name is required");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Keys owned by the core fields. Extension members using one of these keys
/// are never serialized.
pub const PROTECTED_FIELDS: [&str; 6] = ["type", "title", "detail", "status", "code", "instance"];

/// Returns `true` if `key` names one of the six core fields.
#[must_use]
pub fn is_protected(key: &str) -> bool {
    PROTECTED_FIELDS.contains(&key)
}

/// Errors produced while converting a [`DetailedError`] to or from JSON.
#[derive(Debug, Error)]
pub enum ProblemError {
    /// An extension value has no JSON representation.
    #[error("marshaling DetailedError as JSON: {0}")]
    Marshal(#[source] serde_json::Error),

    /// The input is not a valid problem document.
    #[error("unmarshaling DetailedError from JSON: {0}")]
    Unmarshal(#[source] serde_json::Error),
}

/// A value that can be stored as a problem extension member.
///
/// Implemented for every `Serialize + Debug + Send + Sync` type. Conversion
/// to JSON is deferred until the problem is serialized, so a value whose
/// `Serialize` impl fails surfaces as [`ProblemError::Marshal`].
pub trait ExtensionValue: fmt::Debug + Send + Sync {
    /// Converts the value into a JSON value.
    fn to_json(&self) -> Result<Value, serde_json::Error>;
}

impl<T> ExtensionValue for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A shared, immutable extension member value.
#[derive(Clone)]
pub struct Extension(Arc<dyn ExtensionValue>);

impl Extension {
    /// Wraps a value as an extension member.
    pub fn new<T: ExtensionValue + 'static>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Converts the value into JSON.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        self.0.to_json()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Structured, RFC 9457 shaped error.
///
/// Created through [`ErrorCatalog`](crate::ErrorCatalog) constructors or
/// [`DetailedError::new`], then refined with the copy-on-write `with_*`
/// methods.
#[derive(Debug, Clone)]
pub struct DetailedError {
    type_url: String,
    title: String,
    detail: String,
    status: StatusCode,
    code: String,
    instance: String,
    extensions: BTreeMap<String, Extension>,
}

impl DetailedError {
    /// Creates a problem with the given status and title.
    ///
    /// `type` defaults to `about:blank`; every other field starts empty.
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: title.into(),
            detail: String::new(),
            status,
            code: String::new(),
            instance: String::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// URI identifying the problem category.
    #[must_use]
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// Short human-readable summary.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Occurrence-specific explanation.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Domain-specific machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// URI or path identifying this occurrence.
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// All extension members, including any stored under a protected key.
    #[must_use]
    pub fn extensions(&self) -> &BTreeMap<String, Extension> {
        &self.extensions
    }

    /// Returns a single extension member.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Extension> {
        self.extensions.get(key)
    }

    /// Returns a copy with `type` replaced.
    pub fn with_type(&self, type_url: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.type_url = type_url.into();
        next
    }

    /// Returns a copy with `title` replaced.
    pub fn with_title(&self, title: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.title = title.into();
        next
    }

    /// Returns a copy with `detail` replaced.
    pub fn with_detail(&self, detail: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.detail = detail.into();
        next
    }

    /// Returns a copy with `status` replaced.
    pub fn with_status(&self, status: StatusCode) -> Self {
        let mut next = self.clone();
        next.status = status;
        next
    }

    /// Returns a copy with `code` replaced.
    pub fn with_code(&self, code: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.code = code.into();
        next
    }

    /// Returns a copy with `instance` replaced.
    pub fn with_instance(&self, instance: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.instance = instance.into();
        next
    }

    /// Returns a copy with one extension member added or overwritten.
    ///
    /// Keys naming a core field are accepted but never serialized.
    pub fn with_extension<T>(&self, key: impl Into<String>, value: T) -> Self
    where
        T: ExtensionValue + 'static,
    {
        let mut next = self.clone();
        next.extensions.insert(key.into(), Extension::new(value));
        next
    }

    /// Returns a copy with several extension members added or overwritten.
    pub fn with_extensions<K, I>(&self, members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Extension)>,
    {
        let mut next = self.clone();
        next.extensions
            .extend(members.into_iter().map(|(k, v)| (k.into(), v)));
        next
    }

    /// Serializable extension members as a JSON object.
    pub fn extensions_json(&self) -> Result<Map<String, Value>, ProblemError> {
        self.extension_members().map_err(ProblemError::Marshal)
    }

    /// Serializes the problem to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, ProblemError> {
        serde_json::to_vec(self).map_err(ProblemError::Marshal)
    }

    /// Serializes the problem to a JSON string.
    pub fn to_json_string(&self) -> Result<String, ProblemError> {
        serde_json::to_string(self).map_err(ProblemError::Marshal)
    }

    /// Serializes the problem to JSON bytes, panicking on failure.
    ///
    /// Only for tests and startup-time construction, where an unserializable
    /// extension is a programming error.
    ///
    /// # Panics
    ///
    /// Panics if an extension value cannot be represented as JSON.
    #[must_use]
    pub fn must_to_json(&self) -> Vec<u8> {
        match self.to_json() {
            Ok(bytes) => bytes,
            Err(e) => panic!("{e}"),
        }
    }

    /// Parses a problem document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProblemError> {
        serde_json::from_slice(bytes).map_err(ProblemError::Unmarshal)
    }

    fn extension_members(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut object = Map::new();
        for (key, value) in &self.extensions {
            if is_protected(key) {
                continue;
            }
            object.insert(key.clone(), value.to_json()?);
        }
        Ok(object)
    }

    fn to_object(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut object = self.extension_members()?;

        // Core fields go in last so they overwrite anything above.
        object.insert("type".to_string(), Value::String(self.type_url.clone()));
        object.insert("title".to_string(), Value::String(self.title.clone()));
        object.insert("detail".to_string(), Value::String(self.detail.clone()));
        object.insert("status".to_string(), Value::from(self.status.as_u16()));
        object.insert("code".to_string(), Value::String(self.code.clone()));
        object.insert("instance".to_string(), Value::String(self.instance.clone()));
        Ok(object)
    }
}

impl fmt::Display for DetailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.title, self.detail)
    }
}

impl std::error::Error for DetailedError {}

impl Serialize for DetailedError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let object = self.to_object().map_err(S::Error::custom)?;
        object.serialize(serializer)
    }
}

#[derive(Deserialize)]
struct CoreFields {
    #[serde(rename = "type", default)]
    type_url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    code: String,
    #[serde(default)]
    instance: String,
}

impl<'de> Deserialize<'de> for DetailedError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut object = Map::<String, Value>::deserialize(deserializer)?;

        let mut known = Map::new();
        for key in PROTECTED_FIELDS {
            if let Some(value) = object.remove(key) {
                known.insert(key.to_string(), value);
            }
        }
        let core = CoreFields::deserialize(Value::Object(known)).map_err(D::Error::custom)?;

        // A document without a status is treated as a server-side failure.
        let status = match core.status {
            Some(code) => StatusCode::from_u16(code).map_err(D::Error::custom)?,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Ok(Self {
            type_url: core.type_url,
            title: core.title,
            detail: core.detail,
            status,
            code: core.code,
            instance: core.instance,
            extensions: object
                .into_iter()
                .map(|(key, value)| (key, Extension::new(value)))
                .collect(),
        })
    }
}
