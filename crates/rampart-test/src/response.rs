//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use rampart_core::{DetailedError, APPLICATION_PROBLEM_JSON};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A fully buffered response with assertion helpers.
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns `TestError::BodyRead` if the body stream fails.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Creates a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes the body as a JSON value.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Decodes the body as a problem document.
    ///
    /// A missing `status` member decodes as 500.
    pub fn problem(&self) -> Result<DetailedError, TestError> {
        Ok(DetailedError::from_json(&self.body)?)
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {} with body {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a 2xx status.
    ///
    /// # Panics
    ///
    /// Panics if the status is not 2xx.
    #[track_caller]
    pub fn assert_success(&self) -> &Self {
        assert!(self.is_success(), "Expected success status, got {}", self.status);
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or different.
    #[track_caller]
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        match self.header_str(name) {
            Some(actual) => assert_eq!(
                actual, expected,
                "Header '{name}': expected '{expected}', got '{actual}'"
            ),
            None => panic!("Header '{name}' not found"),
        }
        self
    }

    /// Asserts that the Content-Type starts with `expected`.
    ///
    /// # Panics
    ///
    /// Panics if Content-Type is missing or different.
    #[track_caller]
    pub fn assert_content_type(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        match self.content_type() {
            Some(actual) => assert!(
                actual.starts_with(expected),
                "Content-Type: expected '{expected}', got '{actual}'"
            ),
            None => panic!("Content-Type header not found"),
        }
        self
    }

    /// Asserts that the body contains a substring.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't contain the substring.
    #[track_caller]
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            body.contains(expected),
            "Body should contain '{expected}', got: {body}"
        );
        self
    }

    /// Asserts an exact body.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    #[track_caller]
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        assert_eq!(String::from_utf8_lossy(&self.body), expected.as_ref(), "Body mismatch");
        self
    }

    /// Asserts that the body is empty.
    ///
    /// # Panics
    ///
    /// Panics if the body is not empty.
    #[track_caller]
    pub fn assert_empty_body(&self) -> &Self {
        assert!(
            self.body.is_empty(),
            "Expected empty body, got: {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that the JSON body equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or differs.
    #[track_caller]
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        match self.json_value() {
            Ok(actual) => assert_eq!(&actual, expected, "JSON body mismatch"),
            Err(e) => panic!("Body is not JSON: {e}"),
        }
        self
    }

    /// Asserts a problem response with the given status and `type` URI,
    /// and returns the decoded problem for further checks.
    ///
    /// # Panics
    ///
    /// Panics on a different status, content type or `type`, or if the
    /// body is not a problem document.
    #[track_caller]
    pub fn assert_problem(&self, status: StatusCode, type_url: &str) -> DetailedError {
        self.assert_status(status);
        self.assert_content_type(APPLICATION_PROBLEM_JSON);
        let problem = match self.problem() {
            Ok(problem) => problem,
            Err(e) => panic!("Body is not a problem document: {e}"),
        };
        assert_eq!(problem.type_url(), type_url, "Problem type mismatch");
        problem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http_body_util::Full;
    use rampart_core::{problem_response, ErrorCatalog};
    use serde_json::json;

    fn response(status: StatusCode, content_type: &str, body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        TestResponse::new(status, headers, Bytes::from(body.to_string()))
    }

    #[tokio::test]
    async fn test_from_http() {
        let http_response = http::Response::builder()
            .status(StatusCode::CREATED)
            .header("x-id", "7")
            .body(Full::new(Bytes::from("done")))
            .unwrap();

        let response = TestResponse::from_http(http_response).await.unwrap();
        assert_eq!(response.status_code(), 201);
        assert_eq!(response.header_str("x-id"), Some("7"));
        assert_eq!(response.text().unwrap(), "done");
    }

    #[test]
    fn test_json_helpers() {
        let response = response(StatusCode::OK, "application/json", r#"{"id":1,"tags":["a"]}"#);
        response
            .assert_success()
            .assert_content_type("application/json")
            .assert_json_eq(&json!({"id": 1, "tags": ["a"]}));

        #[derive(serde::Deserialize)]
        struct Item {
            id: u32,
        }
        assert_eq!(response.json::<Item>().unwrap().id, 1);
    }

    #[test]
    fn test_body_assertions() {
        let response = response(StatusCode::OK, "text/plain", "hello world");
        response
            .assert_body_contains("world")
            .assert_body_eq("hello world")
            .assert_header("content-type", "text/plain");
    }

    #[test]
    #[should_panic(expected = "Expected status")]
    fn test_assert_status_panics() {
        response(StatusCode::OK, "text/plain", "").assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_problem_round_trip() {
        let catalog = ErrorCatalog::default();
        let http_response = problem_response(&catalog.forbidden("/admin"), &catalog);
        let response = TestResponse::from_http(http_response).await.unwrap();

        let problem = response.assert_problem(
            StatusCode::FORBIDDEN,
            "https://docs.rampart.dev/errors/forbidden.md",
        );
        assert_eq!(problem.instance(), "/admin");
        assert_eq!(problem.code(), "403-01");
    }

    #[test]
    fn test_problem_not_json() {
        let response = response(StatusCode::OK, "text/plain", "nope");
        assert!(matches!(response.problem(), Err(TestError::Problem(_))));
    }
}
