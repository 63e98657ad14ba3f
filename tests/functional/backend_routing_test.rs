//! Functional tests for backend routing

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use inference_gateway::api::routes::create_router;
use inference_gateway::config::{BackendConfig, Settings};
use inference_gateway::AppState;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_gateway(backends: Vec<BackendConfig>) -> (Arc<AppState>, Router) {
    let mut settings = Settings::default();
    settings.backends = backends;
    settings.proxy.request_timeout_secs = 5;

    let state = Arc::new(AppState::from_settings(settings).unwrap());
    let app = create_router(state.clone());
    (state, app)
}

#[tokio::test]
async fn test_passthrough_uses_lowest_priority_number() {
    let preferred = MockServer::start().await;
    let fallback = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "preferred"})))
        .expect(1)
        .mount(&preferred)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fallback)
        .await;

    let (_state, app) = create_gateway(vec![
        BackendConfig::new(fallback.uri(), 5),
        BackendConfig::new(preferred.uri(), 1),
    ]);

    let response = app
        .oneshot(Request::builder().uri("/api/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_passthrough_preserves_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete"))
        .and(query_param("force", "true"))
        .and(header("authorization", "Bearer token"))
        .and(header("x-request-id", "abc-123"))
        .and(body_string(r#"{"name":"llama3"}"#))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-backend", "one")
                .set_body_string("deleted"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_state, app) = create_gateway(vec![BackendConfig::new(server.uri(), 1)]);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/delete?force=true")
        .header("authorization", "Bearer token")
        .header("x-request-id", "abc-123")
        .header("connection", "keep-alive")
        .body(Body::from(r#"{"name":"llama3"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-backend").unwrap(), "one");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"deleted");
}

#[tokio::test]
async fn test_client_errors_are_relayed_without_demotion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let (state, app) = create_gateway(vec![BackendConfig::new(server.uri(), 1)]);

    let request = Request::builder()
        .method("POST")
        .uri("/api/show")
        .body(Body::from(r#"{"name":"missing"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(state.registry.list_all()[0].is_healthy());
}

#[tokio::test]
async fn test_failover_after_server_error() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&secondary)
        .await;

    let (state, app) = create_gateway(vec![
        BackendConfig::new(primary.uri(), 1),
        BackendConfig::new(secondary.uri(), 2),
    ]);

    let pull = || {
        Request::builder()
            .method("POST")
            .uri("/api/pull")
            .body(Body::from(r#"{"name":"llama3"}"#))
            .unwrap()
    };

    let response = app.clone().oneshot(pull()).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"boom");
    assert_eq!(state.registry.health_summary(), (2, 1, 1));

    let response = app.oneshot(pull()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_equal_priorities_keep_registry_order() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .mount(&first)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&second)
        .await;

    let (_state, app) = create_gateway(vec![
        BackendConfig::new(first.uri(), 3),
        BackendConfig::new(second.uri(), 3),
    ]);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"first");
    }
}
