mod common;

use axum::body::Body;
use axum::http::header;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::Router;
use common::*;
use nexqa::api::build_router;
use nexqa::api::handlers::AppState;
use nexqa::AppConfig;
use serde_json::json;
use serde_json::Value;
use tower::ServiceExt;

fn router(h: &Harness) -> Router {
    build_router(AppState::new(h.service.clone(), AppConfig::default()), false)
}

fn default_harness() -> Harness {
    harness(
        MockStore {
            sources: vec!["plan.docx".to_string(), "spec.pdf".to_string()],
            ..MockStore::default()
        }
        .with("checkout risks", four_passages()),
        MockGenerator::streaming(&["Top ", "risk"]),
        StubClassifier::returning("risk"),
        MockReranker::default(),
    )
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let h = default_harness();
    let request = Request::get("/api/health").body(Body::empty()).unwrap();

    let (status, body) = send_json(router(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_info_reports_active_model() {
    let h = default_harness();
    let request = Request::get("/api/info").body(Body::empty()).unwrap();

    let (status, body) = send_json(router(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_model"], "mock-model");
    assert_eq!(body["mode"], "offline");
}

#[tokio::test]
async fn test_rag_query_returns_canonical_type() {
    let h = default_harness();
    let request = post_json(
        "/api/query/rag",
        &json!({ "query": "checkout risks", "use_reranking": false }),
    );

    let (status, body) = send_json(router(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "risk");
    assert_eq!(body["query"], "checkout risks");
    assert_eq!(body["context_chunks"], 4);
    assert_eq!(body["sources"].as_array().unwrap().len(), 4);
    assert_eq!(body["sources"][0]["metadata"]["source"], "spec.pdf");
}

#[tokio::test]
async fn test_rag_query_forced_alias() {
    let h = default_harness();
    let request = post_json(
        "/api/query/rag",
        &json!({ "query": "checkout risks", "type": "test_case" }),
    );

    let (status, body) = send_json(router(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "testcase_excel");
    assert_eq!(h.classifier.calls(), 0);
}

#[tokio::test]
async fn test_missing_query_is_bad_request() {
    let h = default_harness();

    for body in [json!({}), json!({ "query": "  " })] {
        let (status, body) = send_json(router(&h), post_json("/api/query/rag", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query not provided");
    }
    assert!(h.store.calls().is_empty());
}

#[tokio::test]
async fn test_user_id_header_scopes_retrieval() {
    let h = default_harness();
    let mut request = post_json("/api/query/rag", &json!({ "query": "checkout risks", "top_k": 3 }));
    request
        .headers_mut()
        .insert("X-User-ID", "tester-42".parse().unwrap());

    let (status, _) = send(router(&h), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.store.calls()[0],
        ("checkout risks".to_string(), "tester-42".to_string(), 3)
    );

    let (status, _) = send(
        router(&h),
        post_json("/api/query/rag", &json!({ "query": "checkout risks" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.store.calls()[1],
        ("checkout risks".to_string(), "default_user".to_string(), 5)
    );
}

#[tokio::test]
async fn test_retrieval_failure_is_bad_gateway() {
    let h = harness(
        MockStore::failing(),
        MockGenerator::default(),
        StubClassifier::returning("ask"),
        MockReranker::default(),
    );

    let (status, body) =
        send_json(router(&h), post_json("/api/query/rag", &json!({ "query": "foo" }))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["query"], "foo");
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_generation_failure_reports_type() {
    let h = harness(
        MockStore::default().with("foo", four_passages()),
        MockGenerator::failing(),
        StubClassifier::returning("summary"),
        MockReranker::default(),
    );

    let (status, body) =
        send_json(router(&h), post_json("/api/query/rag", &json!({ "query": "foo" }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], "summary");
}

#[tokio::test]
async fn test_rag_stream_sends_sse_events() {
    let h = default_harness();

    let (status, bytes) = send(
        router(&h),
        post_json("/api/query/rag/stream", &json!({ "query": "checkout risks" })),
    )
    .await;
    let text = String::from_utf8(bytes).unwrap();

    assert_eq!(status, StatusCode::OK);
    let meta = text.find("event: meta").unwrap();
    let token = text.find("event: token").unwrap();
    let done = text.find("event: done").unwrap();
    assert!(meta < token && token < done);
    assert!(text.contains(r#""response":"Top risk""#));
    assert!(text.contains(r#""type":"risk""#));
}

#[tokio::test]
async fn test_search_and_document_list() {
    let h = default_harness();

    let (status, body) = send_json(
        router(&h),
        post_json("/api/query/search", &json!({ "query": "checkout risks", "top_k": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(h.store.calls()[0].2, 2);

    let request = Request::get("/api/documents/list")
        .header("x-user-id", "alice")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(router(&h), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "alice");
    assert_eq!(body["documents"], json!(["plan.docx", "spec.pdf"]));
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_mcp_lists_tools() {
    let h = default_harness();
    let request = Request::get("/mcp/tools").body(Body::empty()).unwrap();

    let (status, body) = send_json(router(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["list_documents", "search_documents", "rag_query"]);
}

#[tokio::test]
async fn test_mcp_rag_query_tool() {
    let h = default_harness();
    let call = json!({
        "name": "rag_query",
        "arguments": { "query": "checkout risks", "force_type": "validate" }
    });

    let (status, body) = send_json(router(&h), post_json("/mcp/tools/call", &call)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_error"], false);
    let result: Value = serde_json::from_str(body["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(result["type"], "validate");
    assert_eq!(h.store.calls()[0].1, "mcp_user");
}

#[tokio::test]
async fn test_mcp_tool_errors() {
    let h = default_harness();

    let call = json!({ "name": "drop_tables", "arguments": {} });
    let (status, _) = send(router(&h), post_json("/mcp/tools/call", &call)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let call = json!({ "name": "search_documents", "arguments": {} });
    let (status, body) = send_json(router(&h), post_json("/mcp/tools/call", &call)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_error"], true);
}
