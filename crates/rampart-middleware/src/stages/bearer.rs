//! Bearer token guard.
//!
//! Rejects requests that do not carry `Authorization: Bearer <token>` with
//! the catalog's `unauthorized` problem. An optional validator decides
//! whether a present token is acceptable; rejected tokens get `forbidden`.

use std::fmt;
use std::sync::Arc;

use http::header::AUTHORIZATION;
use rampart_core::{BoxFuture, ErrorCatalog, Request};

use crate::guard::{Guard, GuardResult};

type Validator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Returns the bearer token of a request, if any.
///
/// The scheme is matched case-insensitively and an empty token counts as
/// missing.
pub fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Guard requiring a bearer token.
#[derive(Clone)]
pub struct BearerTokenGuard {
    catalog: ErrorCatalog,
    validator: Option<Validator>,
}

impl BearerTokenGuard {
    /// Accepts any non-empty bearer token.
    pub fn new(catalog: ErrorCatalog) -> Self {
        Self {
            catalog,
            validator: None,
        }
    }

    /// Accepts only tokens for which `validator` returns `true`.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }
}

impl Guard for BearerTokenGuard {
    fn check<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, GuardResult> {
        Box::pin(async move {
            let Some(token) = bearer_token(request) else {
                tracing::debug!(path = %request.uri().path(), "Missing bearer token");
                return Err(self.catalog.unauthorized(request).into());
            };

            match &self.validator {
                Some(validate) if !validate(token) => {
                    tracing::debug!(path = %request.uri().path(), "Bearer token rejected");
                    Err(self.catalog.forbidden(request).into())
                }
                _ => Ok(None),
            }
        })
    }
}

impl fmt::Debug for BearerTokenGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenGuard")
            .field("catalog", &self.catalog)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use rampart_core::DetailedError;

    fn request(auth: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/secure");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Bytes::new()).unwrap()
    }

    fn status_of(result: GuardResult) -> StatusCode {
        result
            .unwrap_err()
            .downcast_ref::<DetailedError>()
            .unwrap()
            .status()
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&request(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&request(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&request(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request(Some("Bearer "))), None);
        assert_eq!(bearer_token(&request(None)), None);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let guard = BearerTokenGuard::new(ErrorCatalog::default());
        let status = status_of(guard.check(&request(None)).await);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejected_token_is_forbidden() {
        let guard = BearerTokenGuard::new(ErrorCatalog::default())
            .with_validator(|token| token == "letmein");

        let status = status_of(guard.check(&request(Some("Bearer nope"))).await);
        assert_eq!(status, StatusCode::FORBIDDEN);

        let ok = guard.check(&request(Some("Bearer letmein"))).await.unwrap();
        assert!(ok.is_none());
    }

    #[tokio::test]
    async fn test_problem_instance_is_request_path() {
        let guard = BearerTokenGuard::new(ErrorCatalog::default());
        let error = guard.check(&request(None)).await.unwrap_err();
        let problem = error.downcast_ref::<DetailedError>().unwrap();
        assert_eq!(problem.instance(), "/secure");
        assert_eq!(problem.code(), "401-01");
    }
}
