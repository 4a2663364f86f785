//! Integration tests for the Tessera HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::HeaderValue;
use axum_test::TestServer;
use serde_json::json;
use std::sync::Mutex;
use tessera::api::{
    AppState, DocumentResponse, FetchResponse, HealthResponse, RetractResponse, SchemaResponse,
    StatusResponse, create_router,
};
use tessera_core::Session;

/// Mutex to serialize auth tests since they modify env vars.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("TESSERA_API_KEY") };
    }
}

/// Create a test server with a fresh in-memory session.
/// Returns a guard that must be kept alive during the test.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("TESSERA_API_KEY") };
    let session = Session::new();
    let state = AppState::new(session);
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

/// Declare an owner-gated schema for `notes` and insert two documents
/// owned by different users.
async fn populate_owner_gated_notes(server: &TestServer) {
    let schema = server
        .post("/schema")
        .json(&json!({
            "collection": "notes",
            "schema": {
                "attributes": {"owner": "string", "body": "string"},
                "rules": {
                    "read": [
                        {
                            "description": "owner only",
                            "filter": [["owner", "=", "$user_id"]]
                        }
                    ]
                }
            }
        }))
        .await;
    schema.assert_status_ok();

    for (id, owner) in [("n1", "alice"), ("n2", "bob")] {
        let response = server
            .post("/document")
            .json(&json!({
                "collection": "notes",
                "id": id,
                "document": {"owner": owner, "body": "hello"}
            }))
            .await;
        response.assert_status_ok();
    }
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_health_returns_correct_version() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;
    let health: HealthResponse = response.json();

    // Version should match Cargo.toml
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_status_empty_store() {
    let (server, _guard) = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert!(status.success);
    assert_eq!(status.triple_count, 0);
    assert_eq!(status.entity_count, 0);
    assert!(status.collections.is_empty());
    assert!(!status.persistent);
}

#[tokio::test]
async fn test_status_populated_store() {
    let (server, _guard) = create_test_server();
    populate_owner_gated_notes(&server).await;

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert!(status.triple_count > 0, "Should have triples");
    assert_eq!(status.entity_count, 2);
    assert_eq!(status.collections, vec!["notes".to_string()]);
}

// =============================================================================
// SCHEMA ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_schema_declaration() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/schema")
        .json(&json!({
            "collection": "users",
            "schema": {"attributes": {"name": "string", "age": "int"}}
        }))
        .await;

    response.assert_status_ok();
    let schema: SchemaResponse = response.json();
    assert!(schema.success);
    assert_eq!(schema.collections, vec!["users".to_string()]);
}

#[tokio::test]
async fn test_schema_redeclaration_replaces() {
    let (server, _guard) = create_test_server();

    for _ in 0..2 {
        let response = server
            .post("/schema")
            .json(&json!({
                "collection": "users",
                "schema": {"attributes": {}}
            }))
            .await;
        response.assert_status_ok();
    }

    let response = server.get("/status").await;
    let status: StatusResponse = response.json();
    assert_eq!(status.collections.len(), 1);
}

// =============================================================================
// DOCUMENT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_document_insert() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/document")
        .json(&json!({
            "collection": "users",
            "id": "alice",
            "document": {"name": "Alice", "age": 30}
        }))
        .await;

    response.assert_status_ok();
    let doc: DocumentResponse = response.json();
    assert!(doc.success);
    assert_eq!(doc.key.as_deref(), Some("users#alice"));
    // name, age, and the collection marker row
    assert_eq!(doc.triples, Some(3));
}

#[tokio::test]
async fn test_document_invalid_id_rejected() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/document")
        .json(&json!({
            "collection": "users",
            "id": "bad#id",
            "document": {"name": "Mallory"}
        }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let doc: DocumentResponse = response.json();
    assert!(!doc.success);
    assert!(doc.error.is_some());
}

#[tokio::test]
async fn test_document_nested_insert() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/document")
        .json(&json!({
            "collection": "users",
            "id": "carol",
            "document": {"name": "Carol", "address": {"city": "Berlin", "zip": "10115"}}
        }))
        .await;

    response.assert_status_ok();
    let doc: DocumentResponse = response.json();
    // name, address.city, address.zip, marker
    assert_eq!(doc.triples, Some(4));
}

// =============================================================================
// FETCH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_fetch_found() {
    let (server, _guard) = create_test_server();

    server
        .post("/document")
        .json(&json!({
            "collection": "users",
            "id": "alice",
            "document": {"name": "Alice"}
        }))
        .await
        .assert_status_ok();

    let response = server
        .post("/fetch")
        .json(&json!({"collection": "users", "id": "alice"}))
        .await;

    response.assert_status_ok();
    let fetch: FetchResponse = response.json();
    assert!(fetch.success);
    assert_eq!(fetch.outcome, "found");
    let entity = fetch.entity.unwrap();
    assert_eq!(
        serde_json::to_value(&entity).unwrap()["name"],
        json!("Alice")
    );
}

#[tokio::test]
async fn test_fetch_absent() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/fetch")
        .json(&json!({"collection": "users", "id": "nobody"}))
        .await;

    response.assert_status_ok();
    let fetch: FetchResponse = response.json();
    assert!(fetch.success);
    assert_eq!(fetch.outcome, "absent");
    assert!(fetch.entity.is_none());
}

#[tokio::test]
async fn test_fetch_redacted() {
    let (server, _guard) = create_test_server();
    populate_owner_gated_notes(&server).await;

    // alice asks for bob's note
    let response = server
        .post("/fetch")
        .json(&json!({
            "collection": "notes",
            "id": "n2",
            "variables": {"user_id": "alice"}
        }))
        .await;

    response.assert_status_ok();
    let fetch: FetchResponse = response.json();
    assert!(fetch.success);
    assert_eq!(fetch.outcome, "redacted");
    assert!(fetch.entity.is_none());
}

#[tokio::test]
async fn test_fetch_own_document_visible() {
    let (server, _guard) = create_test_server();
    populate_owner_gated_notes(&server).await;

    let response = server
        .post("/fetch")
        .json(&json!({
            "collection": "notes",
            "id": "n1",
            "variables": {"user_id": "alice"}
        }))
        .await;

    response.assert_status_ok();
    let fetch: FetchResponse = response.json();
    assert_eq!(fetch.outcome, "found");
}

#[tokio::test]
async fn test_fetch_collection_filters_per_reader() {
    let (server, _guard) = create_test_server();
    populate_owner_gated_notes(&server).await;

    let response = server
        .post("/fetch")
        .json(&json!({
            "collection": "notes",
            "variables": {"user_id": "bob"}
        }))
        .await;

    response.assert_status_ok();
    let fetch: FetchResponse = response.json();
    assert_eq!(fetch.outcome, "collection");
    let entities = fetch.entities.unwrap();
    assert_eq!(entities.len(), 1);
    assert!(entities.contains_key("n2"));
}

#[tokio::test]
async fn test_fetch_unresolved_variable_is_client_error() {
    let (server, _guard) = create_test_server();
    populate_owner_gated_notes(&server).await;

    // No user_id binding at all
    let response = server
        .post("/fetch")
        .json(&json!({"collection": "notes", "id": "n1"}))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let fetch: FetchResponse = response.json();
    assert!(!fetch.success);
    assert_eq!(fetch.outcome, "error");
}

// =============================================================================
// RETRACT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_retract_document() {
    let (server, _guard) = create_test_server();

    server
        .post("/document")
        .json(&json!({
            "collection": "users",
            "id": "alice",
            "document": {"name": "Alice", "age": 30}
        }))
        .await
        .assert_status_ok();

    let response = server
        .post("/retract")
        .json(&json!({"collection": "users", "id": "alice"}))
        .await;

    response.assert_status_ok();
    let retract: RetractResponse = response.json();
    assert!(retract.success);
    assert_eq!(retract.tombstones, Some(3));

    // Retracted document no longer fetches
    let fetch_response = server
        .post("/fetch")
        .json(&json!({"collection": "users", "id": "alice"}))
        .await;
    let fetch: FetchResponse = fetch_response.json();
    assert_eq!(fetch.outcome, "absent");
}

#[tokio::test]
async fn test_retract_missing_document_yields_zero() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/retract")
        .json(&json!({"collection": "users", "id": "ghost"}))
        .await;

    response.assert_status_ok();
    let retract: RetractResponse = response.json();
    assert!(retract.success);
    assert_eq!(retract.tombstones, Some(0));
}

// =============================================================================
// CORS TESTS
// =============================================================================

#[tokio::test]
async fn test_cors_headers_present() {
    let (server, _guard) = create_test_server();

    // Simple request to verify CORS layer doesn't block
    let response = server.get("/health").await;
    response.assert_status_ok();
}

// =============================================================================
// ERROR HANDLING TESTS
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/unknown").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let (server, _guard) = create_test_server();

    // /health is GET only
    let response = server.post("/health").await;
    // axum returns 405 Method Not Allowed
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/document")
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    // Should return 4xx error for invalid JSON
    assert!(response.status_code().is_client_error());
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

/// Create a test server with authentication enabled.
/// Must be called while holding AUTH_TEST_MUTEX.
fn create_auth_test_server(api_key: &str) -> TestServer {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("TESSERA_API_KEY", api_key) };
    let session = Session::new();
    let state = AppState::new(session);
    let router = create_router(state);
    TestServer::new(router).unwrap()
}

/// Clean up auth env var after test.
fn cleanup_auth_env() {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("TESSERA_API_KEY") };
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    cleanup_auth_env();

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.triple_count, 0);
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    // Test raw token format (without "Bearer " prefix)
    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            api_key.parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "correct-key";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Invalid token should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "required-key";
    let server = create_auth_test_server(api_key);

    // Request without Authorization header
    let response = server.get("/status").await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Missing Authorization header should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "secret-key-for-bypass-test";
    let server = create_auth_test_server(api_key);

    // /health should be accessible without authentication
    let response = server.get("/health").await;

    cleanup_auth_env();

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
}

// =============================================================================
// RATE LIMITING TESTS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_exceeded_returns_retry_after() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::remove_var("TESSERA_API_KEY");
        std::env::set_var("TESSERA_RATE_LIMIT", "1");
    }
    let state = AppState::new(Session::new());
    let server = TestServer::new(create_router(state)).unwrap();

    let first = server.get("/health").await;
    let second = server.get("/health").await;

    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("TESSERA_RATE_LIMIT") };

    first.assert_status_ok();
    assert_eq!(
        second.status_code().as_u16(),
        429,
        "Second request within the same second should be throttled"
    );
    assert_eq!(second.header("retry-after"), HeaderValue::from_static("1"));
}

#[tokio::test]
async fn test_auth_bearer_prefix_only_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "actual-key";
    let server = create_auth_test_server(api_key);

    // "Bearer " with no key should be rejected
    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer ".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Bearer prefix without a key should return 401 Unauthorized"
    );
}
