//! Response builders and error normalization.
//!
//! Every failure leaving the pipeline goes through [`error_response`]:
//! a [`DetailedError`] is written verbatim with its own status, anything
//! else is logged and replaced by the catalog's generic server error so
//! internal error text never reaches the client.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::catalog::{ErrorCatalog, InstancePath};
use crate::problem::DetailedError;
use crate::types::{Response, APPLICATION_JSON, APPLICATION_PROBLEM_JSON};

/// A response with no body.
pub fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// A JSON response.
pub fn json_response<T>(status: StatusCode, body: &T) -> Result<Response, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(body)?;
    Ok(with_body(status, APPLICATION_JSON, bytes))
}

/// Writes a problem document with the problem's own status.
///
/// If an extension value cannot be marshaled, the failure is logged and the
/// catalog's server error for the same instance is written instead.
pub fn problem_response(problem: &DetailedError, catalog: &ErrorCatalog) -> Response {
    match problem.to_json() {
        Ok(bytes) => with_body(problem.status(), APPLICATION_PROBLEM_JSON, bytes),
        Err(e) => {
            tracing::error!(
                error = %e,
                status = problem.status().as_u16(),
                code = problem.code(),
                instance = problem.instance(),
                "Problem failed to marshal, writing server error"
            );
            let fallback = catalog.server_error(problem.instance());
            with_body(
                fallback.status(),
                APPLICATION_PROBLEM_JSON,
                fallback.to_json().unwrap_or_default(),
            )
        }
    }
}

/// Normalizes any pipeline error into a problem.
pub fn to_problem(
    error: &anyhow::Error,
    catalog: &ErrorCatalog,
    at: &(impl InstancePath + ?Sized),
) -> DetailedError {
    match error.downcast_ref::<DetailedError>() {
        Some(problem) => problem.clone(),
        None => {
            let problem = catalog.server_error(at);
            tracing::error!(
                error = %error,
                instance = problem.instance(),
                "Unclassified error replaced by server error"
            );
            problem
        }
    }
}

/// Normalizes any pipeline error and writes it as a problem response.
pub fn error_response(
    error: &anyhow::Error,
    catalog: &ErrorCatalog,
    at: &(impl InstancePath + ?Sized),
) -> Response {
    problem_response(&to_problem(error, catalog, at), catalog)
}

fn with_body(status: StatusCode, content_type: &'static str, bytes: Vec<u8>) -> Response {
    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_problem_response() {
        let catalog = ErrorCatalog::default();
        let response = problem_response(&catalog.not_found("/users/1"), &catalog);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            APPLICATION_PROBLEM_JSON
        );
        assert_eq!(body_json(response).await["code"], "404-01");
    }

    #[tokio::test]
    async fn test_unmarshalable_problem_becomes_server_error() {
        let catalog = ErrorCatalog::default();
        let mut bad = HashMap::new();
        bad.insert((1u8, 1u8), 1u8);
        let problem = catalog.conflict("/orders/9").with_extension("bad", bad);

        let response = problem_response(&problem, &catalog);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            APPLICATION_PROBLEM_JSON
        );

        let json = body_json(response).await;
        assert_eq!(json["code"], "500-01");
        assert_eq!(json["status"], 500);
        assert_eq!(json["instance"], "/orders/9");
        assert_eq!(json["type"], catalog.type_url(crate::ErrorKind::ServerError));
        assert!(json.get("bad").is_none());
    }

    #[tokio::test]
    async fn test_error_response_passes_detailed_error_through() {
        let catalog = ErrorCatalog::default();
        let error = anyhow::Error::new(catalog.forbidden("/admin").with_detail("admins only"));

        let response = error_response(&error, &catalog, "/ignored");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let json = body_json(response).await;
        assert_eq!(json["detail"], "admins only");
        assert_eq!(json["instance"], "/admin");
    }

    #[tokio::test]
    async fn test_error_response_hides_internal_errors() {
        let catalog = ErrorCatalog::default();
        let error = anyhow::anyhow!("database password is hunter2");

        let response = error_response(&error, &catalog, "/users");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["code"], "500-01");
        assert_eq!(json["instance"], "/users");
        assert!(!json.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = json_response(StatusCode::CREATED, &json!({"id": 1})).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
        assert_eq!(body_json(response).await, json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_empty_response() {
        let response = empty_response(StatusCode::ACCEPTED);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }
}
