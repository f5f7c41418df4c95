//! API scenario tests against an in-process stub of the ERP API
//!
//! The stub implements just enough surface for the api-tagged scenarios:
//! bearer-token auth on the order list, order creation with sequential
//! numbers, and clean rejection of hostile payloads.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use prodflow_harness::ApiClient;
use prodflow_scenarios::runner::{ScenarioRunner, SuiteCx};
use prodflow_scenarios::scenarios;
use prodflow_scenarios::{SimErp, SuiteConfig};

const TOKEN: &str = "qa-token";

#[derive(Clone)]
struct StubState {
    next_number: Arc<AtomicU32>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_orders(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        );
    }
    (StatusCode::OK, Json(json!({"orders": []})))
}

async fn create_order(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        );
    }
    let name = body.get("name").and_then(|n| n.as_str()).unwrap_or("");
    if name.is_empty() || name.contains(';') || name.to_uppercase().contains("DROP TABLE") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": "invalid order name"})),
        );
    }
    let number = state.next_number.fetch_add(1, Ordering::SeqCst);
    (StatusCode::CREATED, Json(json!({"number": number})))
}

/// Bind the stub on an ephemeral port and return its base URL.
async fn spawn_stub() -> String {
    let state = StubState {
        next_number: Arc::new(AtomicU32::new(1500)),
    };
    let app = Router::new()
        .route("/health", get(health))
        .route("/orders", get(list_orders).post(create_order))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub serve");
    });
    format!("http://{addr}")
}

fn api_runner() -> ScenarioRunner {
    let mut runner = ScenarioRunner::new(scenarios::suite());
    runner.retain_tagged("api");
    runner
}

#[tokio::test]
async fn api_scenarios_pass_against_the_stub() {
    let base = spawn_stub().await;

    let api = ApiClient::new(&base).unwrap();
    api.wait_ready(Duration::from_secs(5)).await.unwrap();

    let config = SuiteConfig {
        api_url: base,
        api_token: Some(TOKEN.to_string()),
        ..SuiteConfig::default()
    };
    let mut cx = SuiteCx::new(config, Box::new(SimErp::new().driver())).unwrap();

    let result = api_runner().run(&mut cx).await;
    assert!(
        result.all_passed(),
        "failures: {:?}",
        result
            .results
            .iter()
            .filter(|r| !r.success)
            .map(|r| (&r.name, &r.error))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn anonymous_order_list_is_refused() {
    let base = spawn_stub().await;
    let api = ApiClient::new(&base).unwrap();
    api.wait_ready(Duration::from_secs(5)).await.unwrap();

    let err = api.get("/orders").await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("401"), "expected a 401, got: {text}");
}

#[tokio::test]
async fn concurrent_creations_get_distinct_numbers() {
    let base = spawn_stub().await;
    let api = ApiClient::new(&base).unwrap().with_token(TOKEN);
    api.wait_ready(Duration::from_secs(5)).await.unwrap();

    let results = api
        .fan_out(5, |i| {
            (
                "/orders".to_string(),
                json!({"name": format!("Заказ {i}"), "urgency": "01.09.2026"}),
            )
        })
        .await;

    let mut numbers: Vec<u64> = results
        .into_iter()
        .map(|r| r.unwrap()["number"].as_u64().expect("number in body"))
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), 5);
}
