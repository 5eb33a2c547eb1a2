//! Integration tests for the HTTP adapter

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::time::sleep;
use tower::ServiceExt;

use common::{pipeline, two_partitions, ScriptedModel, UnreachableStore};
use ragdesk::api::{ApiServer, ApiServerConfig};
use ragdesk::search::VectorStore;

async fn test_router(model: Arc<ScriptedModel>, config: ApiServerConfig) -> Router {
    let pipeline = Arc::new(pipeline(two_partitions().await, model));
    ApiServer::new(config, pipeline).router()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = test_router(Arc::new(ScriptedModel::new(&[])), ApiServerConfig::default()).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_query_returns_plain_text_by_default() {
    let model = Arc::new(ScriptedModel::new(&["TCP is ", "reliable."]));
    let app = test_router(model, ApiServerConfig::default()).await;

    let response = app
        .oneshot(post_json("/query", json!({"query": "What is TCP?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_text(response).await, "TCP is reliable.");
}

#[tokio::test]
async fn test_query_with_sources_as_json() {
    let model = Arc::new(ScriptedModel::new(&["answer"]));
    let app = test_router(model, ApiServerConfig::default()).await;

    let response = app
        .oneshot(post_json(
            "/query",
            json!({"question": "handshake", "partition": "a", "include_sources": true, "as_text": false}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["answer"], "answer");
    assert_eq!(body["partition"], "a");
    assert_eq!(body["sources"][0]["id"], "a-1");
    assert_eq!(body["sources"][0]["partition"], "a");
}

#[tokio::test]
async fn test_blank_query_is_bad_request() {
    let model = Arc::new(ScriptedModel::new(&["never"]));
    let app = test_router(model.clone(), ApiServerConfig::default()).await;

    let response = app
        .oneshot(post_json("/query", json!({"query": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["detail"].as_str().unwrap().contains("query"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_ask_streams_only_answer_text() {
    let model = Arc::new(ScriptedModel::new(&["Binary ", "search ", "halves."]));
    let app = test_router(model, ApiServerConfig::default()).await;

    let response = app
        .oneshot(post_json("/ask", json!({"question": "binary search?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Binary search halves.");
}

#[tokio::test]
async fn test_retrieval_failure_is_bad_gateway() {
    let unreachable: Arc<dyn VectorStore> = Arc::new(UnreachableStore);
    let pipeline = Arc::new(pipeline(
        vec![("a", unreachable)],
        Arc::new(ScriptedModel::new(&["never"])),
    ));
    let app = ApiServer::new(ApiServerConfig::default(), pipeline).router();

    let response = app
        .oneshot(post_json("/ask", json!({"query": "q"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_rate_limit_rejects_over_quota() {
    let config = ApiServerConfig {
        rate_limit_requests: 2,
        ..ApiServerConfig::default()
    };
    let app = test_router(Arc::new(ScriptedModel::new(&[])), config).await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_text(response).await, "Rate limit exceeded. Try again later.");
}

#[tokio::test]
async fn test_server_answers_over_tcp() {
    let port = 18437;
    let pipeline = Arc::new(pipeline(
        two_partitions().await,
        Arc::new(ScriptedModel::new(&["over ", "the wire"])),
    ));
    let config = ApiServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..ApiServerConfig::default()
    };

    // Start server
    let _server_handle = tokio::spawn(async move {
        let _ = ApiServer::new(config, pipeline).start().await;
    });
    sleep(Duration::from_millis(300)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/ask", port))
        .json(&json!({"query": "anything"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "over the wire");
}
