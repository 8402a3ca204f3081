//! Integration tests against a local stand-in for the Figma REST API.
//!
//! A real axum server is spun up per test on an ephemeral port, serving
//! canned payloads and counting requests, so cache semantics, error
//! rephrasing and batch behaviour are exercised over real HTTP.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use figma_variables_mcp::figma::{FigmaClient, UpstreamError};
use figma_variables_mcp::mcp::tools::{ToolCallResult, ToolContent, ToolRouter};

#[derive(Clone)]
struct FakeFigma {
    file_requests: Arc<AtomicUsize>,
}

fn fixture_variables() -> Value {
    json!({
        "status": 200,
        "error": false,
        "meta": {
            "variables": {
                "VariableID:1:1": {
                    "id": "VariableID:1:1",
                    "name": "color/a",
                    "resolvedType": "COLOR",
                    "variableCollectionId": "VariableCollectionId:1:0",
                    "valuesByMode": {
                        "1:0": { "type": "VARIABLE_ALIAS", "id": "VariableID:1:2" }
                    }
                },
                "VariableID:1:2": {
                    "id": "VariableID:1:2",
                    "name": "color/b",
                    "resolvedType": "COLOR",
                    "variableCollectionId": "VariableCollectionId:1:0",
                    "valuesByMode": {
                        "1:0": { "type": "VARIABLE_ALIAS", "id": "VariableID:1:1" }
                    }
                },
                "VariableID:1:3": {
                    "id": "VariableID:1:3",
                    "name": "spacing/sm",
                    "resolvedType": "FLOAT",
                    "variableCollectionId": "VariableCollectionId:1:0",
                    "valuesByMode": { "1:0": 4.0 }
                },
                "VariableID:1:4": {
                    "id": "VariableID:1:4",
                    "name": "color/d",
                    "resolvedType": "COLOR",
                    "variableCollectionId": "VariableCollectionId:1:0",
                    "valuesByMode": {
                        "1:0": { "type": "VARIABLE_ALIAS", "id": "VariableID:9:9" }
                    }
                }
            },
            "variableCollections": {
                "VariableCollectionId:1:0": {
                    "id": "VariableCollectionId:1:0",
                    "name": "tokens",
                    "modes": [{ "modeId": "1:0", "name": "Default" }],
                    "defaultModeId": "1:0"
                }
            }
        }
    })
}

fn chain_variables() -> Value {
    json!({
        "status": 200,
        "error": false,
        "meta": {
            "variables": {
                "VariableID:2:1": {
                    "id": "VariableID:2:1",
                    "name": "alias/x",
                    "resolvedType": "FLOAT",
                    "variableCollectionId": "VariableCollectionId:2:0",
                    "valuesByMode": {
                        "2:0": { "type": "VARIABLE_ALIAS", "id": "VariableID:2:2" }
                    }
                },
                "VariableID:2:2": {
                    "id": "VariableID:2:2",
                    "name": "base/y",
                    "resolvedType": "FLOAT",
                    "variableCollectionId": "VariableCollectionId:2:0",
                    "valuesByMode": { "2:0": 8.0 }
                },
                "VariableID:2:3": {
                    "id": "VariableID:2:3",
                    "name": "base/z",
                    "resolvedType": "FLOAT",
                    "variableCollectionId": "VariableCollectionId:2:0",
                    "valuesByMode": { "2:0": 16.0 }
                }
            },
            "variableCollections": {
                "VariableCollectionId:2:0": {
                    "id": "VariableCollectionId:2:0",
                    "name": "chain",
                    "modes": [{ "modeId": "2:0", "name": "Default" }],
                    "defaultModeId": "2:0"
                }
            }
        }
    })
}

async fn get_file(State(state): State<FakeFigma>, Path(key): Path<String>) -> Response {
    state.file_requests.fetch_add(1, Ordering::SeqCst);
    let headers = [("x-ratelimit-remaining", "99"), ("x-ratelimit-reset", "30")];
    match key.as_str() {
        "fixture" => (
            StatusCode::OK,
            headers,
            Json(json!({
                "name": "Design System",
                "lastModified": "2026-08-01T10:00:00Z",
                "version": "42",
                "editorType": "figma",
                "document": { "children": [{ "id": "0:1" }, { "id": "0:2" }] }
            })),
        )
            .into_response(),
        "badjson" => (StatusCode::OK, headers, "this is not json").into_response(),
        "forbidden" => (
            StatusCode::FORBIDDEN,
            headers,
            Json(json!({ "err": "Token lacks file access" })),
        )
            .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            headers,
            Json(json!({ "err": "Not found" })),
        )
            .into_response(),
    }
}

async fn get_local_variables(Path(key): Path<String>) -> Response {
    match key.as_str() {
        "fixture" => Json(fixture_variables()).into_response(),
        "chain" => Json(chain_variables()).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "err": "Not found" }))).into_response(),
    }
}

async fn post_variables(Path(_key): Path<String>, Json(_payload): Json<Value>) -> Response {
    Json(json!({
        "status": 200,
        "error": false,
        "meta": {
            "tempIdToRealId": {
                "tmp_collection": "VariableCollectionId:9:0",
                "tmp_mode": "9:0"
            }
        }
    }))
    .into_response()
}

async fn get_project_files(Path(id): Path<String>) -> Response {
    if id == "77" {
        Json(json!({
            "name": "Website",
            "files": [
                { "key": "fixture", "name": "Design System", "lastModified": "2026-08-01T10:00:00Z" },
                { "key": "drafts", "name": "Drafts" }
            ]
        }))
        .into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "err": "Not found" }))).into_response()
    }
}

async fn spawn_fake_figma() -> (String, Arc<AtomicUsize>) {
    let file_requests = Arc::new(AtomicUsize::new(0));
    let state = FakeFigma {
        file_requests: Arc::clone(&file_requests),
    };

    let app = Router::new()
        .route("/v1/files/{key}", get(get_file))
        .route("/v1/files/{key}/variables/local", get(get_local_variables))
        .route("/v1/files/{key}/variables", post(post_variables))
        .route("/v1/projects/{id}/files", get(get_project_files))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), file_requests)
}

fn client_with_ttl(base_url: &str, ttl: Duration) -> FigmaClient {
    FigmaClient::with_base_url("figd_test".to_string(), base_url.to_string(), 500, ttl)
}

fn result_text(result: &ToolCallResult) -> &str {
    let ToolContent::Text { text } = &result.content[0];
    text
}

fn result_json(result: &ToolCallResult) -> Value {
    serde_json::from_str(result_text(result)).expect("tool result should be JSON")
}

// =============================================================================
// Cache semantics
// =============================================================================

#[tokio::test]
async fn cache_hit_never_touches_the_network() {
    let (base_url, file_requests) = spawn_fake_figma().await;
    let client = client_with_ttl(&base_url, Duration::from_secs(300));

    let first = client.get_file("fixture").await.unwrap();
    let second = client.get_file("fixture").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(file_requests.load(Ordering::SeqCst), 1);
    assert_eq!(client.stats_snapshot().total_calls, 1);
}

#[tokio::test]
async fn ttl_expiry_triggers_exactly_one_refetch() {
    let (base_url, file_requests) = spawn_fake_figma().await;
    let client = client_with_ttl(&base_url, Duration::from_millis(50));

    client.get_file("fixture").await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    client.get_file("fixture").await.unwrap();
    client.get_file("fixture").await.unwrap();

    // One initial fetch, one refetch after expiry, then a hit.
    assert_eq!(file_requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rate_limit_headroom_is_tracked() {
    let (base_url, _) = spawn_fake_figma().await;
    let client = client_with_ttl(&base_url, Duration::from_secs(300));

    client.get_file("fixture").await.unwrap();
    let stats = client.stats_snapshot();
    assert_eq!(stats.rate_limit_remaining, Some(99));
    assert_eq!(stats.rate_limit_reset, Some(30));
    assert!(stats.average_latency_ms >= 0.0);
}

#[tokio::test]
async fn failures_update_stats_and_last_error() {
    let (base_url, _) = spawn_fake_figma().await;
    let client = client_with_ttl(&base_url, Duration::from_secs(300));

    let err = client.get_file("missing").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Api { status: 404, .. }));

    let stats = client.stats_snapshot();
    assert_eq!(stats.total_calls, 1);
    assert_eq!(stats.failed_calls, 1);
    let last = stats.last_error.unwrap();
    assert!(last.endpoint.contains("/v1/files/missing"));
}

#[tokio::test]
async fn malformed_body_is_not_a_request_failure() {
    let (base_url, _) = spawn_fake_figma().await;
    let client = client_with_ttl(&base_url, Duration::from_secs(300));

    let err = client.get_file("badjson").await.unwrap_err();
    assert!(matches!(err, UpstreamError::MalformedResponse { .. }));
}

// =============================================================================
// Tool handlers over the wire
// =============================================================================

fn router(base_url: &str) -> ToolRouter {
    ToolRouter::new(Arc::new(client_with_ttl(base_url, Duration::from_secs(300))))
}

#[tokio::test]
async fn get_file_summarises_the_document() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke("get-file", &json!({ "fileKey": "fixture" }))
        .await;
    assert!(!result.is_error);
    let summary = result_json(&result);
    assert_eq!(summary["name"], "Design System");
    assert_eq!(summary["pages"], 2);
}

#[tokio::test]
async fn upstream_404_is_rephrased() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke("get-file", &json!({ "fileKey": "missing" }))
        .await;
    assert!(result.is_error);
    assert_eq!(result_text(&result), "Resource not found: file missing");
}

#[tokio::test]
async fn upstream_403_is_rephrased() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke("get-file", &json!({ "fileKey": "forbidden" }))
        .await;
    assert!(result.is_error);
    assert!(result_text(&result).contains("Permission denied for file forbidden"));
}

#[tokio::test]
async fn list_files_returns_project_listing() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke("list-files", &json!({ "projectId": "77" }))
        .await;
    assert!(!result.is_error);
    let listing = result_json(&result);
    assert_eq!(listing["fileCount"], 2);
    assert_eq!(listing["files"][0]["key"], "fixture");
}

#[tokio::test]
async fn delete_batch_reports_per_item_outcomes() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke(
            "delete_variables",
            &json!({
                "fileKey": "fixture",
                "variableIds": ["VariableID:1:1", "VariableID:9:9", "VariableID:1:3"]
            }),
        )
        .await;
    assert!(!result.is_error);

    let summary = result_json(&result);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["succeeded"], 2);
    assert_eq!(summary["failed"], 1);

    let results = summary["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["status"], "deleted");
    assert_eq!(results[1]["status"], "error");
    assert!(results[1]["error"]
        .as_str()
        .unwrap()
        .contains("Resource not found: variable VariableID:9:9"));
    assert_eq!(results[2]["status"], "deleted");
}

#[tokio::test]
async fn update_skips_unknown_targets_without_aborting() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke(
            "update_variables",
            &json!({
                "fileKey": "fixture",
                "updates": [
                    { "id": "VariableID:1:3", "name": "spacing/small" },
                    { "id": "VariableID:8:8", "name": "ghost" }
                ]
            }),
        )
        .await;

    let summary = result_json(&result);
    assert_eq!(summary["succeeded"], 1);
    assert_eq!(summary["failed"], 1);
}

#[tokio::test]
async fn validate_references_reports_cycles_and_dangling_targets() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke("validate_references", &json!({ "fileKey": "fixture" }))
        .await;
    assert!(!result.is_error);

    let report = result_json(&result);
    assert_eq!(report["checked"], 4);
    assert_eq!(report["valid"], false);

    let problems = report["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 3);

    let kinds_for = |id: &str| -> Vec<&str> {
        problems
            .iter()
            .filter(|p| p["variableId"] == id)
            .map(|p| p["kind"].as_str().unwrap())
            .collect()
    };
    assert_eq!(kinds_for("VariableID:1:1"), vec!["circular_reference"]);
    assert_eq!(kinds_for("VariableID:1:2"), vec!["circular_reference"]);
    assert_eq!(kinds_for("VariableID:1:4"), vec!["dangling_reference"]);
    assert!(kinds_for("VariableID:1:3").is_empty());
}

#[tokio::test]
async fn validate_references_flags_unknown_ids() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke(
            "validate_references",
            &json!({ "fileKey": "chain", "variableIds": ["VariableID:2:1", "VariableID:0:0"] }),
        )
        .await;

    let report = result_json(&result);
    assert_eq!(report["checked"], 2);
    let problems = report["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0]["variableId"], "VariableID:0:0");
    assert_eq!(problems[0]["kind"], "not_found");
}

#[tokio::test]
async fn create_reference_rejects_a_would_be_cycle() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    // chain already holds 2:1 -> 2:2; the reverse edge closes a cycle.
    let result = router
        .invoke(
            "create_reference",
            &json!({
                "fileKey": "chain",
                "sourceId": "VariableID:2:2",
                "targetId": "VariableID:2:1"
            }),
        )
        .await;
    assert!(result.is_error);
    assert!(result_text(&result).contains("circular reference"));
}

#[tokio::test]
async fn create_reference_writes_an_acyclic_edge() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke(
            "create_reference",
            &json!({
                "fileKey": "chain",
                "sourceId": "VariableID:2:2",
                "targetId": "VariableID:2:3"
            }),
        )
        .await;
    assert!(!result.is_error, "{}", result_text(&result));

    let report = result_json(&result);
    assert_eq!(report["status"], "reference_created");
    assert_eq!(report["modeId"], "2:0");
}

#[tokio::test]
async fn create_reference_checks_both_endpoints_exist() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke(
            "create_reference",
            &json!({
                "fileKey": "chain",
                "sourceId": "VariableID:2:2",
                "targetId": "VariableID:5:5"
            }),
        )
        .await;
    assert!(result.is_error);
    assert_eq!(
        result_text(&result),
        "Resource not found: variable VariableID:5:5"
    );
}

#[tokio::test]
async fn create_theme_reports_nested_outcomes() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke(
            "create_theme",
            &json!({
                "fileKey": "fixture",
                "name": "Brand",
                "modes": [
                    {
                        "name": "Light",
                        "variableValues": {
                            "spacing/sm": 8.0,
                            "does/not/exist": 1.0
                        }
                    }
                ]
            }),
        )
        .await;
    assert!(!result.is_error);

    let report = result_json(&result);
    assert_eq!(report["theme"], "Brand");
    assert_eq!(report["collectionId"], "VariableCollectionId:9:0");

    let modes = report["modes"].as_array().unwrap();
    assert_eq!(modes.len(), 1);
    assert_eq!(modes[0]["status"], "created");
    assert_eq!(modes[0]["modeId"], "9:0");

    let variables = modes[0]["variables"].as_array().unwrap();
    assert_eq!(variables.len(), 2);
    let by_name = |name: &str| -> &Value {
        variables
            .iter()
            .find(|v| v["name"] == name || v["id"] == name)
            .unwrap()
    };
    assert_eq!(by_name("spacing/sm")["status"], "set");
    assert_eq!(by_name("does/not/exist")["status"], "error");
}

#[tokio::test]
async fn create_variables_rejects_duplicates_of_existing_names() {
    let (base_url, _) = spawn_fake_figma().await;
    let router = router(&base_url);

    let result = router
        .invoke(
            "create_variables",
            &json!({
                "fileKey": "fixture",
                "variables": [
                    { "name": "spacing/sm", "resolvedType": "FLOAT",
                      "variableCollectionId": "VariableCollectionId:1:0" },
                    { "name": "spacing/lg", "resolvedType": "FLOAT",
                      "variableCollectionId": "VariableCollectionId:1:0" }
                ]
            }),
        )
        .await;

    let summary = result_json(&result);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["succeeded"], 1);
    let results = summary["results"].as_array().unwrap();
    assert!(results[0]["error"]
        .as_str()
        .unwrap()
        .contains("already exists"));
    assert_eq!(results[1]["status"], "created");
}
