//! A small service assembled from configuration through the prelude.

use std::sync::{Arc, Mutex};

use http::StatusCode;
use rampart::prelude::*;
use rampart_test::TestClient;
use serde::{Deserialize, Serialize};
use serde_json::json;

const CONFIG: &str = r#"
    [server]
    http_addr = "127.0.0.1:0"
    request_timeout_ms = 2000

    [errors]
    docs_base_url = "https://errors.example.com/"
    type_scheme = "url"
"#;

#[derive(Debug, Clone)]
struct Tenant(String);

#[derive(Debug, Deserialize)]
struct Transfer {
    amount: i64,
}

#[derive(Debug, Serialize)]
struct Receipt {
    tenant: String,
    account: String,
    amount: i64,
}

fn service(log: Arc<Mutex<Vec<&'static str>>>) -> Server {
    let config = ConfigLoader::new()
        .with_string(CONFIG, "toml")
        .unwrap()
        .load()
        .unwrap();
    let catalog = config.errors.catalog();

    let transfer = {
        let catalog = catalog.clone();
        let log = Arc::clone(&log);
        json_handler(&config.errors.catalog(), move |data: RequestData<Transfer>| {
            log.lock().unwrap().push("handler");
            let catalog = catalog.clone();
            async move {
                if data.body.amount <= 0 {
                    let problem = catalog.business_rule_violation(
                        data.path(),
                        [Violation::pointer("/amount", "must be positive")],
                    );
                    return Err(anyhow::Error::from(problem));
                }
                let tenant = data.extension::<Tenant>().map(|t| t.0.clone()).unwrap_or_default();
                Ok(Some(JsonResponse::created(Receipt {
                    tenant,
                    account: data.param("account").unwrap_or_default().to_string(),
                    amount: data.body.amount,
                })))
            }
        })
    };

    let ping = json_handler(&catalog, |_: RequestData<()>| async {
        Ok::<_, anyhow::Error>(None::<JsonResponse<()>>)
    });

    let tenant_log = Arc::clone(&log);
    let tenant = interceptor_fn(move |mut request: Request| {
        tenant_log.lock().unwrap().push("interceptor");
        let tenant = request
            .headers()
            .get("x-tenant")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let catalog = ErrorCatalog::new("https://errors.example.com/").with_scheme(TypeScheme::Url);
        async move {
            match tenant {
                Some(tenant) => {
                    request.extensions_mut().insert(Tenant(tenant));
                    Ok(request)
                }
                None => Err(anyhow::Error::from(catalog.bad_request(&request))),
            }
        }
    });

    let middleware_log = Arc::clone(&log);
    let audit = middleware_fn("audit", move |request: Request, next: Next| {
        middleware_log.lock().unwrap().push("middleware");
        next.run(request)
    });

    let guard_log = Arc::clone(&log);
    let maintenance = guard_fn(move |request: &Request| {
        guard_log.lock().unwrap().push("guard");
        let closed = request.headers().contains_key("x-maintenance");
        async move {
            if closed {
                Ok::<_, anyhow::Error>(Some(empty_response(StatusCode::SERVICE_UNAVAILABLE)))
            } else {
                Ok(None)
            }
        }
    });

    let accounts = EndpointGroup::from_iter([
        Endpoint::post("/accounts/{account}/transfers", transfer),
        Endpoint::get("/ping", ping),
    ])
    .with_prefix("/api")
    .with_request_interceptor(tenant)
    .with_middleware(audit)
    .with_middleware(AccessLogMiddleware::new())
    .with_guard(maintenance);

    config.server_builder().endpoints(accounts).build()
}

fn taken(log: &Arc<Mutex<Vec<&'static str>>>) -> Vec<&'static str> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[tokio::test]
async fn successful_transfer_runs_every_stage_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = TestClient::new(service(Arc::clone(&log)));

    let response = client
        .post("/api/accounts/acc-7/transfers")
        .header("x-tenant", "acme")
        .json(&json!({"amount": 250}))
        .send()
        .await;

    response
        .assert_status(StatusCode::CREATED)
        .assert_json_eq(&json!({"tenant": "acme", "account": "acc-7", "amount": 250}));
    assert_eq!(taken(&log), ["interceptor", "middleware", "guard", "handler"]);
}

#[tokio::test]
async fn business_rule_violation_uses_configured_catalog() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = TestClient::new(service(log));

    let response = client
        .post("/api/accounts/acc-7/transfers")
        .header("x-tenant", "acme")
        .json(&json!({"amount": -5}))
        .send()
        .await;

    let problem = response.assert_problem(
        StatusCode::UNPROCESSABLE_ENTITY,
        "https://errors.example.com/business-rule-violation",
    );
    assert_eq!(problem.instance(), "/api/accounts/acc-7/transfers");
}

#[tokio::test]
async fn interceptor_rejection_skips_the_rest() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = TestClient::new(service(Arc::clone(&log)));

    let response = client.get("/api/ping").send().await;

    response.assert_problem(StatusCode::BAD_REQUEST, "https://errors.example.com/bad-request");
    assert_eq!(taken(&log), ["interceptor"]);
}

#[tokio::test]
async fn guard_answers_directly() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = TestClient::new(service(Arc::clone(&log)));

    let response = client
        .get("/api/ping")
        .header("x-tenant", "acme")
        .header("x-maintenance", "1")
        .send()
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE).assert_empty_body();
    assert_eq!(taken(&log), ["interceptor", "middleware", "guard"]);
}

#[tokio::test]
async fn empty_result_is_no_content() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = TestClient::new(service(log));

    client
        .get("/api/ping")
        .header("x-tenant", "acme")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT)
        .assert_empty_body();
}

#[tokio::test]
async fn undecodable_body_is_bad_request() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = TestClient::new(service(Arc::clone(&log)));

    let response = client
        .post("/api/accounts/acc-7/transfers")
        .header("x-tenant", "acme")
        .body("{not json")
        .send()
        .await;

    response.assert_problem(StatusCode::BAD_REQUEST, "https://errors.example.com/bad-request");
    assert!(!taken(&log).contains(&"handler"));
}
