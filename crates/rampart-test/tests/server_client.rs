//! Driving a full `Server` through the in-memory client.

use http::StatusCode;
use rampart_core::{ErrorCatalog, Violation};
use rampart_middleware::stages::{BearerTokenGuard, RequestIdInterceptor, RequestIdMiddleware};
use rampart_server::{json_handler, Endpoint, EndpointGroup, JsonResponse, RequestData, Server};
use rampart_test::TestClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
struct NewUser {
    name: String,
}

#[derive(Debug, Serialize)]
struct User {
    id: u32,
    name: String,
}

fn app() -> Server {
    let catalog = ErrorCatalog::default();

    let create = json_handler(&catalog, |data: RequestData<NewUser>| {
        let catalog = ErrorCatalog::default();
        async move {
            if data.body.name.is_empty() {
                let problem = catalog.constraint_violation(
                    data.path(),
                    [Violation::pointer("/name", "must not be empty")],
                );
                return Err(anyhow::Error::from(problem));
            }
            Ok(Some(JsonResponse::created(User {
                id: 1,
                name: data.body.name,
            })))
        }
    });

    let show = json_handler(&catalog, |data: RequestData<()>| {
        let id = data.param("id").unwrap_or_default().to_string();
        async move {
            match id.parse::<u32>() {
                Ok(id) => Ok(Some(JsonResponse::ok(User {
                    id,
                    name: "Ada".to_string(),
                }))),
                Err(e) => Err(anyhow::anyhow!("bad id {id}: {e}")),
            }
        }
    });

    let users = EndpointGroup::from_iter([
        Endpoint::post("/users", create),
        Endpoint::get("/users/{id}", show),
    ])
    .with_prefix("/v1")
    .with_guard(BearerTokenGuard::new(catalog.clone()).with_validator(|token| token == "letmein"))
    .with_request_interceptor(RequestIdInterceptor::new())
    .with_middleware(RequestIdMiddleware);

    Server::builder().catalog(catalog).endpoints(users).build()
}

#[tokio::test]
async fn creates_user() {
    let client = TestClient::new(app())
        .with_default_header("authorization", "Bearer letmein")
        .unwrap();

    let response = client.post("/v1/users").json(&json!({"name": "Grace"})).send().await;

    response
        .assert_status(StatusCode::CREATED)
        .assert_content_type("application/json")
        .assert_json_eq(&json!({"id": 1, "name": "Grace"}));
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn constraint_violation_is_a_problem_document() {
    let client = TestClient::new(app());

    let response = client
        .post("/v1/users")
        .bearer_token("letmein")
        .json(&json!({"name": ""}))
        .send()
        .await;

    let problem = response.assert_problem(
        StatusCode::UNPROCESSABLE_ENTITY,
        "https://docs.rampart.dev/errors/constraint-violation.md",
    );
    assert_eq!(problem.instance(), "/v1/users");
    let extensions = problem.extensions_json().unwrap();
    assert_eq!(extensions["violations"][0]["pointer"], "/name");
}

#[tokio::test]
async fn missing_and_rejected_tokens() {
    let client = TestClient::new(app());

    client.get("/v1/users/3").send().await.assert_problem(
        StatusCode::UNAUTHORIZED,
        "https://docs.rampart.dev/errors/unauthorized.md",
    );

    client
        .get("/v1/users/3")
        .bearer_token("guess")
        .send()
        .await
        .assert_problem(StatusCode::FORBIDDEN, "https://docs.rampart.dev/errors/forbidden.md");
}

#[tokio::test]
async fn unclassified_errors_hide_internals() {
    let client = TestClient::new(app());

    let response = client.get("/v1/users/abc").bearer_token("letmein").send().await;

    response.assert_problem(
        StatusCode::INTERNAL_SERVER_ERROR,
        "https://docs.rampart.dev/errors/server-error.md",
    );
    assert!(!response.text().unwrap().contains("bad id"));
}

#[tokio::test]
async fn unknown_route_and_wrong_method() {
    let client = TestClient::new(app());

    client
        .get("/v2/nothing")
        .send()
        .await
        .assert_problem(StatusCode::NOT_FOUND, "https://docs.rampart.dev/errors/not-found.md");

    let response = client.delete("/v1/users").send().await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.header_str("allow").unwrap().contains("POST"));
}
