//! Router-level tests. PostgreSQL is never dialled: the pool is lazy and
//! every request here is answered before a query would run.

use academy_api::config::Config;
use academy_api::db::Database;
use academy_api::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_app(upstream_url: &str) -> (Router, AppState) {
    let config = Config::for_local(upstream_url, upstream_url);
    let db = Database::connect_lazy(&config.database).expect("lazy pool");
    let state = AppState::build(config, db).await.expect("app state");
    (build_router(state.clone()), state)
}

async fn signed_in(state: &AppState) -> String {
    let session_id = state.sessions.create(Uuid::new_v4()).await.unwrap();
    format!("{}={}", state.config.session.cookie_name, session_id)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_responds_ok() {
    let (app, _) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn protected_route_without_session_is_unauthorized() {
    let (app, _) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(Request::get("/api/v1/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_session_is_unauthorized() {
    let (app, _) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(
            Request::get("/api/v1/feed")
                .header(header::AUTHORIZATION, "Bearer not-a-real-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_check_reports_anonymous_caller() {
    let (app, _) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(Request::get("/api/v1/auth/session").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["authenticated"], false);
    assert!(body.get("user").is_none());
}

#[tokio::test]
async fn ticker_search_is_public() {
    let (app, _) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(
            Request::get("/api/v1/search?q=apple&limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["query"], "apple");
    assert_eq!(body["results"][0]["symbol"], "AAPL");
    assert_eq!(body["results"][0]["score"], 60);
}

#[tokio::test]
async fn explain_proxies_to_llm() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header_eq("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "A limit order sets the worst price you accept." }
            }]
        })))
        .expect(1)
        .mount(&llm)
        .await;

    let (app, state) = test_app(&llm.uri()).await;
    let cookie = signed_in(&state).await;

    let response = app
        .oneshot(
            Request::post("/api/v1/ai/explain")
                .header(header::COOKIE, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"term":"limit order"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["reply"], "A limit order sets the worst price you accept.");
    assert_eq!(body["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn llm_failure_surfaces_as_server_error() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&llm)
        .await;

    let (app, state) = test_app(&llm.uri()).await;
    let cookie = signed_in(&state).await;

    let response = app
        .oneshot(
            Request::post("/api/v1/ai/chat")
                .header(header::COOKIE, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message":"What is a stock split?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let (app, state) = test_app("http://127.0.0.1:9").await;
    let cookie = signed_in(&state).await;

    let response = app
        .oneshot(
            Request::get("/api/v1/posts/not-a-uuid")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], "Invalid post ID");
}

#[tokio::test]
async fn unsupported_bar_timeframe_is_rejected() {
    let (app, state) = test_app("http://127.0.0.1:9").await;
    let cookie = signed_in(&state).await;

    let response = app
        .oneshot(
            Request::get("/api/v1/market/bars/AAPL?timeframe=2Day")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
