//! Canonical problem constructors.
//!
//! [`ErrorCatalog`] turns an [`ErrorKind`] into a fully populated
//! [`DetailedError`]. The documentation base URL used to build `type` values
//! is configuration owned by the catalog value, so two catalogs with
//! different base URLs can coexist in one process.
//!
//! | Kind                    | Status | Code   | Type slug                 |
//! |-------------------------|--------|--------|---------------------------|
//! | `BadRequest`            | 400    | 400-01 | `bad-request`             |
//! | `BadParameters`         | 400    | 400-02 | `bad-parameters`          |
//! | `Unauthorized`          | 401    | 401-01 | `unauthorized`            |
//! | `Forbidden`             | 403    | 403-01 | `forbidden`               |
//! | `NotFound`              | 404    | 404-01 | `not-found`               |
//! | `Conflict`              | 409    | 409-01 | `conflict`                |
//! | `ConstraintViolation`   | 422    | 422-01 | `constraint-violation`    |
//! | `BusinessRuleViolation` | 422    | 422-02 | `business-rule-violation` |
//! | `ServerError`           | 500    | 500-01 | `server-error`            |
//!
//! The transport answers with three more kinds of its own:
//!
//! | Kind                    | Status | Code   | Type slug                 |
//! |-------------------------|--------|--------|---------------------------|
//! | `MethodNotAllowed`      | 405    | 405-01 | `method-not-allowed`      |
//! | `PayloadTooLarge`       | 413    | 413-01 | `payload-too-large`       |
//! | `GatewayTimeout`        | 504    | 504-01 | `gateway-timeout`         |
//!
//! # Example
//!
//! ```
//! use rampart_core::ErrorCatalog;
//!
//! let catalog = ErrorCatalog::new("https://docs.example.com/errors/");
//! let problem = catalog.not_found("/users/42");
//!
//! assert_eq!(problem.status().as_u16(), 404);
//! assert_eq!(problem.type_url(), "https://docs.example.com/errors/not-found.md");
//! assert_eq!(problem.instance(), "/users/42");
//! ```

use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::problem::DetailedError;

/// Default documentation base URL for problem `type` values.
pub const DEFAULT_DOCS_BASE_URL: &str = "https://docs.rampart.dev/errors/";

/// Extension key holding structured violation records.
pub const VIOLATIONS_KEY: &str = "violations";

/// How problem `type` URIs are derived from the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeScheme {
    /// `<base><slug>.md`, pointing at markdown documentation.
    #[default]
    Markdown,
    /// `<base><slug>`, for documentation served as plain pages.
    Url,
}

/// Categories of canonical problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or undecodable request.
    BadRequest,
    /// Invalid query or path parameters.
    BadParameters,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Caller lacks permission.
    Forbidden,
    /// Resource does not exist.
    NotFound,
    /// Conflicts with current resource state.
    Conflict,
    /// Input violates field-level constraints.
    ConstraintViolation,
    /// Input violates a domain rule.
    BusinessRuleViolation,
    /// Unclassified internal failure.
    ServerError,
    /// Route exists but not for this method.
    MethodNotAllowed,
    /// Request body exceeds the configured limit.
    PayloadTooLarge,
    /// Request did not finish within the configured timeout.
    GatewayTimeout,
}

impl ErrorKind {
    /// Returns every kind in table order.
    #[must_use]
    pub const fn all() -> [Self; 12] {
        [
            Self::BadRequest,
            Self::BadParameters,
            Self::Unauthorized,
            Self::Forbidden,
            Self::NotFound,
            Self::Conflict,
            Self::ConstraintViolation,
            Self::BusinessRuleViolation,
            Self::ServerError,
            Self::MethodNotAllowed,
            Self::PayloadTooLarge,
            Self::GatewayTimeout,
        ]
    }

    /// HTTP status for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::BadParameters => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ConstraintViolation | Self::BusinessRuleViolation => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short human-readable summary.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::BadParameters => "Bad Parameters",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Conflict => "Conflict",
            Self::ConstraintViolation => "Constraint Violation",
            Self::BusinessRuleViolation => "Business Rule Violation",
            Self::ServerError => "Internal Server Error",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::GatewayTimeout => "Gateway Timeout",
        }
    }

    /// Default occurrence detail.
    #[must_use]
    pub const fn detail(self) -> &'static str {
        match self {
            Self::BadRequest => "The request is invalid or malformed",
            Self::BadParameters => "The request parameters are invalid",
            Self::Unauthorized => "Authentication is required to access this resource",
            Self::Forbidden => "You do not have permission to access this resource",
            Self::NotFound => "The requested resource was not found",
            Self::Conflict => "The request conflicts with the current state of the resource",
            Self::ConstraintViolation => "The request violates one or more constraints",
            Self::BusinessRuleViolation => "The request violates one or more business rules",
            Self::ServerError => "An unexpected error occurred while processing the request",
            Self::MethodNotAllowed => "The requested method is not supported for this resource",
            Self::PayloadTooLarge => "The request body is too large",
            Self::GatewayTimeout => "The request did not complete in time",
        }
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "400-01",
            Self::BadParameters => "400-02",
            Self::Unauthorized => "401-01",
            Self::Forbidden => "403-01",
            Self::NotFound => "404-01",
            Self::Conflict => "409-01",
            Self::ConstraintViolation => "422-01",
            Self::BusinessRuleViolation => "422-02",
            Self::ServerError => "500-01",
            Self::MethodNotAllowed => "405-01",
            Self::PayloadTooLarge => "413-01",
            Self::GatewayTimeout => "504-01",
        }
    }

    /// Documentation slug appended to the base URL.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::BadRequest => "bad-request",
            Self::BadParameters => "bad-parameters",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not-found",
            Self::Conflict => "conflict",
            Self::ConstraintViolation => "constraint-violation",
            Self::BusinessRuleViolation => "business-rule-violation",
            Self::ServerError => "server-error",
            Self::MethodNotAllowed => "method-not-allowed",
            Self::PayloadTooLarge => "payload-too-large",
            Self::GatewayTimeout => "gateway-timeout",
        }
    }
}

/// One structured violation carried under the `violations` extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Human-readable description.
    pub detail: String,

    /// JSON pointer into the request body (e.g. `/email`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,

    /// Offending query or path parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,

    /// Optional URI identifying the violated rule.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,
}

impl Violation {
    /// A violation located by a JSON pointer into the body.
    pub fn pointer(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            pointer: Some(pointer.into()),
            parameter: None,
            type_url: None,
        }
    }

    /// A violation located by a request parameter name.
    pub fn parameter(parameter: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            pointer: None,
            parameter: Some(parameter.into()),
            type_url: None,
        }
    }

    /// Attaches a rule URI.
    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = Some(type_url.into());
        self
    }
}

/// Anything that identifies the occurrence of a problem.
///
/// Implemented for plain paths and for HTTP request types, where the
/// request path is used.
pub trait InstancePath {
    /// Returns the `instance` value.
    fn instance_path(&self) -> String;
}

impl InstancePath for str {
    fn instance_path(&self) -> String {
        self.to_string()
    }
}

impl InstancePath for String {
    fn instance_path(&self) -> String {
        self.clone()
    }
}

impl InstancePath for http::Uri {
    fn instance_path(&self) -> String {
        self.path().to_string()
    }
}

impl InstancePath for http::request::Parts {
    fn instance_path(&self) -> String {
        self.uri.path().to_string()
    }
}

impl<B> InstancePath for http::Request<B> {
    fn instance_path(&self) -> String {
        self.uri().path().to_string()
    }
}

/// Builds canonical problems against a documentation base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCatalog {
    base_url: Arc<str>,
    scheme: TypeScheme,
}

impl Default for ErrorCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_DOCS_BASE_URL)
    }
}

impl ErrorCatalog {
    /// Creates a catalog using the markdown type scheme.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: Arc::from(base_url.as_ref()),
            scheme: TypeScheme::Markdown,
        }
    }

    /// Returns a copy using a different type scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: TypeScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Documentation base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Active type scheme.
    #[must_use]
    pub const fn scheme(&self) -> TypeScheme {
        self.scheme
    }

    /// The `type` URI for a kind.
    #[must_use]
    pub fn type_url(&self, kind: ErrorKind) -> String {
        match self.scheme {
            TypeScheme::Markdown => format!("{}{}.md", self.base_url, kind.slug()),
            TypeScheme::Url => format!("{}{}", self.base_url, kind.slug()),
        }
    }

    /// Builds the canonical problem for `kind` at `at`.
    pub fn problem(&self, kind: ErrorKind, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        DetailedError::new(kind.status(), kind.title())
            .with_type(self.type_url(kind))
            .with_detail(kind.detail())
            .with_code(kind.code())
            .with_instance(at.instance_path())
    }

    /// 400: invalid or malformed request.
    pub fn bad_request(&self, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        self.problem(ErrorKind::BadRequest, at)
    }

    /// 400: invalid parameters, with one record per offending parameter.
    pub fn bad_parameters(
        &self,
        at: &(impl InstancePath + ?Sized),
        violations: impl IntoIterator<Item = Violation>,
    ) -> DetailedError {
        self.with_violations(ErrorKind::BadParameters, at, violations)
    }

    /// 401: authentication required.
    pub fn unauthorized(&self, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        self.problem(ErrorKind::Unauthorized, at)
    }

    /// 403: permission denied.
    pub fn forbidden(&self, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        self.problem(ErrorKind::Forbidden, at)
    }

    /// 404: resource not found.
    pub fn not_found(&self, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        self.problem(ErrorKind::NotFound, at)
    }

    /// 409: conflicting state.
    pub fn conflict(&self, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        self.problem(ErrorKind::Conflict, at)
    }

    /// 422: field-level constraint violations.
    pub fn constraint_violation(
        &self,
        at: &(impl InstancePath + ?Sized),
        violations: impl IntoIterator<Item = Violation>,
    ) -> DetailedError {
        self.with_violations(ErrorKind::ConstraintViolation, at, violations)
    }

    /// 422: domain rule violations.
    pub fn business_rule_violation(
        &self,
        at: &(impl InstancePath + ?Sized),
        violations: impl IntoIterator<Item = Violation>,
    ) -> DetailedError {
        self.with_violations(ErrorKind::BusinessRuleViolation, at, violations)
    }

    /// 500: unclassified failure. Never carries internal error text.
    pub fn server_error(&self, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        self.problem(ErrorKind::ServerError, at)
    }

    /// 405: the route does not accept this method.
    pub fn method_not_allowed(&self, at: &(impl InstancePath + ?Sized)) -> DetailedError {
        self.problem(ErrorKind::MethodNotAllowed, at)
    }

    /// 413: the request body exceeds `limit` bytes.
    pub fn payload_too_large(
        &self,
        at: &(impl InstancePath + ?Sized),
        limit: usize,
    ) -> DetailedError {
        self.problem(ErrorKind::PayloadTooLarge, at)
            .with_detail(format!("The request body exceeds {limit} bytes"))
    }

    /// 504: the request ran longer than `timeout`.
    pub fn gateway_timeout(
        &self,
        at: &(impl InstancePath + ?Sized),
        timeout: std::time::Duration,
    ) -> DetailedError {
        self.problem(ErrorKind::GatewayTimeout, at).with_detail(format!(
            "The request did not complete within {}ms",
            timeout.as_millis()
        ))
    }

    fn with_violations(
        &self,
        kind: ErrorKind,
        at: &(impl InstancePath + ?Sized),
        violations: impl IntoIterator<Item = Violation>,
    ) -> DetailedError {
        let violations: Vec<Violation> = violations.into_iter().collect();
        self.problem(kind, at).with_extension(VIOLATIONS_KEY, violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const BASE: &str = "https://docs.example.com/errors/";

    #[test]
    fn test_bad_request_wire_format() {
        let catalog = ErrorCatalog::new(BASE);
        let json = catalog.bad_request("/tests").to_json_string().unwrap();

        assert_eq!(
            json,
            r#"{"code":"400-01","detail":"The request is invalid or malformed","instance":"/tests","status":400,"title":"Bad Request","type":"https://docs.example.com/errors/bad-request.md"}"#
        );
    }

    #[test]
    fn test_every_kind_uses_catalog_fields() {
        let catalog = ErrorCatalog::new(BASE);
        for kind in ErrorKind::all() {
            let problem = catalog.problem(kind, "/p");
            assert_eq!(problem.status(), kind.status());
            assert_eq!(problem.title(), kind.title());
            assert_eq!(problem.detail(), kind.detail());
            assert_eq!(problem.code(), kind.code());
            assert_eq!(problem.instance(), "/p");
            assert_eq!(problem.type_url(), format!("{BASE}{}.md", kind.slug()));
            assert!(
                problem.status().is_client_error() || problem.status().is_server_error(),
                "{kind:?} should map to an error status"
            );
        }
    }

    #[test]
    fn test_transport_problems() {
        let catalog = ErrorCatalog::new(BASE);

        let too_large = catalog.payload_too_large("/upload", 1024);
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.code(), "413-01");
        assert_eq!(too_large.detail(), "The request body exceeds 1024 bytes");
        assert_eq!(too_large.type_url(), format!("{BASE}payload-too-large.md"));

        let timeout = catalog.gateway_timeout("/slow", std::time::Duration::from_millis(250));
        assert_eq!(timeout.code(), "504-01");
        assert_eq!(timeout.detail(), "The request did not complete within 250ms");

        let wrong_method = catalog.method_not_allowed("/users");
        assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(wrong_method.instance(), "/users");
    }

    #[test]
    fn test_url_scheme() {
        let catalog = ErrorCatalog::new(BASE).with_scheme(TypeScheme::Url);
        assert_eq!(
            catalog.forbidden("/x").type_url(),
            "https://docs.example.com/errors/forbidden"
        );
    }

    #[test]
    fn test_default_base_url() {
        let catalog = ErrorCatalog::default();
        assert_eq!(catalog.base_url(), DEFAULT_DOCS_BASE_URL);
        assert_eq!(catalog.scheme(), TypeScheme::Markdown);
    }

    #[test]
    fn test_zero_violations_serialize_as_empty_array() {
        let catalog = ErrorCatalog::new(BASE);
        let problem = catalog.constraint_violation("/users", Vec::new());

        let json: Value = serde_json::from_slice(&problem.must_to_json()).unwrap();
        assert_eq!(json[VIOLATIONS_KEY], json!([]));
    }

    #[test]
    fn test_violations_are_serialized() {
        let catalog = ErrorCatalog::new(BASE);
        let problem = catalog.constraint_violation(
            "/users",
            [
                Violation::pointer("/email", "must be a valid email"),
                Violation::pointer("/age", "must be positive").with_type("https://rules/age"),
            ],
        );

        let json: Value = serde_json::from_slice(&problem.must_to_json()).unwrap();
        assert_eq!(json["status"], 422);
        assert_eq!(json["code"], "422-01");
        assert_eq!(
            json[VIOLATIONS_KEY],
            json!([
                {"detail": "must be a valid email", "pointer": "/email"},
                {"detail": "must be positive", "pointer": "/age", "type": "https://rules/age"}
            ])
        );
    }

    #[test]
    fn test_bad_parameters_use_parameter_field() {
        let catalog = ErrorCatalog::new(BASE);
        let problem =
            catalog.bad_parameters("/search", [Violation::parameter("limit", "must be <= 100")]);

        let json: Value = serde_json::from_slice(&problem.must_to_json()).unwrap();
        assert_eq!(json["code"], "400-02");
        assert_eq!(json[VIOLATIONS_KEY][0]["parameter"], "limit");
        assert!(json[VIOLATIONS_KEY][0].get("pointer").is_none());
    }

    #[test]
    fn test_business_rule_violation() {
        let catalog = ErrorCatalog::new(BASE);
        let problem = catalog.business_rule_violation(
            "/orders",
            [Violation::pointer("/quantity", "exceeds stock")],
        );
        assert_eq!(problem.code(), "422-02");
        assert_eq!(problem.title(), "Business Rule Violation");
    }

    #[test]
    fn test_instance_from_request() {
        let catalog = ErrorCatalog::new(BASE);
        let request = http::Request::builder()
            .uri("/users/7?verbose=true")
            .body(())
            .unwrap();

        assert_eq!(catalog.unauthorized(&request).instance(), "/users/7");
    }
}
