use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, binary_payload, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn content_type(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_raw_path_and_query() {
    let resp = app()
        .oneshot(get("/echo/a/val%2Ffoo/b?key=v1&key=v2"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/echo/a/val%2Ffoo/b");
    assert_eq!(echo.query.as_deref(), Some("key=v1&key=v2"));
}

#[tokio::test]
async fn echo_reports_headers_and_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(http::header::CONTENT_TYPE, "text/plain")
        .header("Fetch-User-Agent", "foo/1.2.3")
        .body("Hello World".to_string())
        .unwrap();

    let echo: Echo = body_json(app().oneshot(req).await.unwrap()).await;

    assert_eq!(echo.method, "POST");
    assert_eq!(echo.headers["content-type"], "text/plain");
    assert_eq!(echo.headers["fetch-user-agent"], "foo/1.2.3");
    assert_eq!(echo.body, "Hello World");
    assert!(echo.query.is_none());
}

// --- status ---

#[tokio::test]
async fn status_route_answers_with_requested_code() {
    let resp = app().oneshot(get("/status/404")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(content_type(&resp), "application/json");
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["errorCode"], "Not Found");
}

#[tokio::test]
async fn status_route_rejects_invalid_code() {
    let resp = app().oneshot(get("/status/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- flaky ---

#[tokio::test]
async fn flaky_fails_then_recovers() {
    let app = app();
    let uri = "/flaky/k1?failures=2&retry_after=10";

    for _ in 0..2 {
        let resp = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers().get(http::header::RETRY_AFTER).unwrap(), "10");
    }

    let resp = app.clone().oneshot(get(uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["attempts"], 3);
}

#[tokio::test]
async fn flaky_keys_are_independent() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(get("/flaky/a?failures=1&status=429"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().get(http::header::RETRY_AFTER).is_none());

    let resp = app
        .clone()
        .oneshot(get("/flaky/b?failures=0"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- content types ---

#[tokio::test]
async fn binary_is_octet_stream() {
    let resp = app().oneshot(get("/binary")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(content_type(&resp), "application/octet-stream");
    assert_eq!(body_bytes(resp).await, binary_payload());
}

#[tokio::test]
async fn text_is_plain() {
    let resp = app().oneshot(get("/text")).await.unwrap();
    assert_eq!(content_type(&resp), "text/plain");
    assert_eq!(body_bytes(resp).await, "Hello, world!");
}

#[tokio::test]
async fn malformed_claims_json() {
    let resp = app().oneshot(get("/malformed")).await.unwrap();
    assert_eq!(content_type(&resp), "application/json");
    assert!(serde_json::from_slice::<serde_json::Value>(&body_bytes(resp).await).is_err());
}

#[tokio::test]
async fn empty_returns_204() {
    let req = Request::builder()
        .method("DELETE")
        .uri("/empty")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
