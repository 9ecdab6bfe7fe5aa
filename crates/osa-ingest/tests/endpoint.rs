//! Endpoint behaviour over in-process warp requests

use osa_core::{InMemoryWorkflowStore, WorkflowStatus, WorkflowStore};
use osa_ingest::{routes, AuthPolicy, IngestConfig, IngestService};
use osa_test_utils::{agent_payload, partial_workflow_body, workflow_body, FailingStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

const TOKEN: &str = "test-token";
const PATH: &str = "/api/opal/osa-workflow";

fn config() -> IngestConfig {
    IngestConfig::default().with_token(TOKEN)
}

fn service(config: &IngestConfig, store: Arc<dyn WorkflowStore>) -> Arc<IngestService> {
    Arc::new(IngestService::from_config(config, store))
}

async fn post(
    service: Arc<IngestService>,
    authorization: Option<&str>,
    body: &Value,
) -> warp::http::Response<warp::hyper::body::Bytes> {
    let mut request = warp::test::request()
        .method("POST")
        .path(PATH)
        .json(body);
    if let Some(value) = authorization {
        request = request.header("authorization", value);
    }
    request.reply(&routes::api(service, 1024 * 1024)).await
}

fn json_body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn bearer() -> String {
    format!("Bearer {TOKEN}")
}

#[tokio::test]
async fn partial_workflow_is_accepted() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let service = service(&config(), store.clone());

    let response = post(service, Some(&bearer()), &partial_workflow_body("wf_1")).await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-workflow-id"], "wf_1");
    assert!(response.headers()["x-processing-time"]
        .to_str()
        .unwrap()
        .ends_with("ms"));

    let body = json_body(&response);
    assert_eq!(body["workflow_id"], "wf_1");
    assert_eq!(body["status"], "partial");
    assert_eq!(body["agents_received"].as_array().unwrap().len(), 2);
    assert_eq!(body["workflow_execution_time_ms"], 500);

    let stored = store.get("wf_1").await.unwrap().unwrap();
    assert_eq!(stored.status(), WorkflowStatus::Partial);
}

#[tokio::test]
async fn envelope_without_required_fields_is_rejected_before_aggregation() {
    let cases = [
        json!({"agent_data": [agent_payload("content_review", 10)]}),
        json!({"workflow_id": "wf_no_agents"}),
        json!({"workflow_id": "wf_empty", "agent_data": []}),
        json!({"workflow_id": "wf_object", "agent_data": {"agent_id": "geo_audit"}}),
    ];

    for body in cases {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let service = service(&config(), store.clone());

        let response = post(service, Some(&bearer()), &body).await;

        assert_eq!(response.status(), 400, "body: {body}");
        assert_eq!(json_body(&response)["error"], "missing_field");
        assert!(response.headers().contains_key("x-processing-time"));
        assert!(store.is_empty());
    }
}

#[tokio::test]
async fn unknown_agent_is_named_in_the_error() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let service = service(&config(), store.clone());
    let body = workflow_body("wf_bad", vec![agent_payload("not_a_real_agent", 10)]);

    let response = post(service, Some(&bearer()), &body).await;

    assert_eq!(response.status(), 400);
    let body = json_body(&response);
    assert_eq!(body["error"], "unknown_agent");
    assert!(body["message"].as_str().unwrap().contains("not_a_real_agent"));
    assert!(body["timestamp"].is_string());
    assert!(store.is_empty());
}

#[tokio::test]
async fn one_bad_agent_rejects_the_whole_batch() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let service = service(&config(), store.clone());
    let body = workflow_body(
        "wf_mixed",
        vec![
            agent_payload("content_review", 10),
            agent_payload("geo_audit", 20),
            json!({"agent_id": "geo_audit", "execution_results": {}, "metadata": {}}),
        ],
    );

    let response = post(service, Some(&bearer()), &body).await;

    assert_eq!(response.status(), 400);
    assert!(store.get("wf_mixed").await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let service = service(&config(), Arc::new(InMemoryWorkflowStore::new()));

    let response = warp::test::request()
        .method("POST")
        .path(PATH)
        .header("authorization", bearer())
        .body("{\"workflow_id\": ")
        .reply(&routes::api(service, 1024))
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(json_body(&response)["error"], "malformed_body");
}

#[tokio::test]
async fn missing_or_wrong_token_is_unauthorized() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let body = partial_workflow_body("wf_auth");

    let response = post(service(&config(), store.clone()), None, &body).await;
    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
    assert_eq!(json_body(&response)["error"], "unauthorized");

    let response = post(service(&config(), store.clone()), Some("Bearer nope"), &body).await;
    assert_eq!(response.status(), 401);
    assert!(store.is_empty());
}

#[tokio::test]
async fn testing_policy_admits_only_missing_credentials() {
    let config = config().with_auth_policy(AuthPolicy::PermitMissingForTesting);
    let store = Arc::new(InMemoryWorkflowStore::new());

    let response = post(service(&config, store.clone()), None, &partial_workflow_body("wf_dev")).await;
    assert_eq!(response.status(), 200);

    let response = post(
        service(&config, store.clone()),
        Some("Bearer nope"),
        &partial_workflow_body("wf_dev_bad"),
    )
    .await;
    assert_eq!(response.status(), 401);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn store_failure_is_a_server_error_with_timing() {
    let store = Arc::new(FailingStore::new());
    let service = service(&config(), store.clone());

    let response = post(service, Some(&bearer()), &partial_workflow_body("wf_down")).await;

    assert_eq!(response.status(), 500);
    assert!(response.headers().contains_key("x-processing-time"));
    assert!(!response.headers().contains_key("x-workflow-id"));
    assert_eq!(json_body(&response)["error"], "store_unavailable");
    assert_eq!(store.save_attempts(), 1);
}

#[tokio::test]
async fn oversized_body_is_refused_with_timing() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let service = service(&config(), store.clone());
    let body = partial_workflow_body("wf_big");

    let response = warp::test::request()
        .method("POST")
        .path(PATH)
        .header("authorization", bearer())
        .json(&body)
        .reply(&routes::api(service.clone(), 16))
        .await;

    assert_eq!(response.status(), 413);
    assert!(response.headers()["x-processing-time"]
        .to_str()
        .unwrap()
        .ends_with("ms"));
    assert_eq!(json_body(&response)["error"], "payload_too_large");
    assert!(store.is_empty());

    let status = service.status().await;
    assert_eq!(status.workflows_received, 1);
    assert_eq!(status.workflows_rejected, 1);
}

#[tokio::test]
async fn body_at_the_limit_is_read_in_full() {
    let body = serde_json::to_vec(&partial_workflow_body("wf_exact")).unwrap();
    let limit = u64::try_from(body.len()).unwrap();
    let service = service(&config(), Arc::new(InMemoryWorkflowStore::new()));

    let response = warp::test::request()
        .method("POST")
        .path(PATH)
        .header("authorization", bearer())
        .body(body)
        .reply(&routes::api(service, limit))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(json_body(&response)["workflow_id"], "wf_exact");
}

#[tokio::test]
async fn execution_results_are_echoed_as_submitted() {
    let service = service(&config(), Arc::new(InMemoryWorkflowStore::new()));
    let results = json!({
        "content_quality_score": null,
        "recommendations": [],
        "reviewer": {"pass": 2},
    });
    let mut agent = agent_payload("content_review", 40);
    agent["execution_results"] = results.clone();

    let response = post(service, Some(&bearer()), &workflow_body("wf_echo", vec![agent])).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        json_body(&response)["agents_received"][0]["execution_results"],
        results
    );
}

#[tokio::test]
async fn preflight_returns_static_cors_headers() {
    let service = service(&config(), Arc::new(FailingStore::new()));

    let response = warp::test::request()
        .method("OPTIONS")
        .path(PATH)
        .reply(&routes::api(service, 1024))
        .await;

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type, Authorization");
    assert_eq!(headers["access-control-max-age"], "86400");
}

#[tokio::test]
async fn status_reports_counters() {
    let service = service(&config(), Arc::new(InMemoryWorkflowStore::new()));

    post(service.clone(), Some(&bearer()), &partial_workflow_body("wf_seen")).await;
    post(service.clone(), None, &partial_workflow_body("wf_refused")).await;

    let response = warp::test::request()
        .method("GET")
        .path(PATH)
        .reply(&routes::api(service, 1024))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["cache-control"], "no-cache");
    let body = json_body(&response);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["workflows_received"], 2);
    assert_eq!(body["workflows_accepted"], 1);
    assert_eq!(body["workflows_rejected"], 1);
    assert_eq!(body["last_workflow_id"], "wf_seen");
    assert_eq!(body["store_reachable"], true);
}

#[tokio::test]
async fn status_is_a_server_error_when_the_store_is_down() {
    let service = service(&config(), Arc::new(FailingStore::new()));

    let response = warp::test::request()
        .method("GET")
        .path(PATH)
        .reply(&routes::api(service, 1024))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(json_body(&response)["store_reachable"], false);
}

#[tokio::test]
async fn unknown_routes_and_methods_get_json_errors() {
    let service = service(&config(), Arc::new(InMemoryWorkflowStore::new()));
    let api = routes::api(service, 1024);

    let response = warp::test::request()
        .method("GET")
        .path("/api/opal/elsewhere")
        .reply(&api)
        .await;
    assert_eq!(response.status(), 404);
    assert_eq!(json_body(&response)["error"], "not_found");

    let response = warp::test::request()
        .method("DELETE")
        .path(PATH)
        .reply(&api)
        .await;
    assert_eq!(response.status(), 405);
    assert_eq!(json_body(&response)["error"], "method_not_allowed");
}
