use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct FlakyParams {
    /// Number of failing answers before the first success.
    #[serde(default = "default_failures")]
    pub failures: u32,
    #[serde(default = "default_flaky_status")]
    pub status: u16,
    /// Sent as `Retry-After`, in milliseconds.
    pub retry_after: Option<String>,
}

fn default_failures() -> u32 {
    2
}

fn default_flaky_status() -> u16 {
    503
}

/// Attempts seen per `/flaky` key.
pub type Attempts = Arc<RwLock<HashMap<String, u32>>>;

/// Size of the `/binary` payload.
pub const BINARY_LEN: usize = 64 * 1024;

pub fn app() -> Router {
    let attempts: Attempts = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/flaky/{key}", any(flaky))
        .route("/binary", get(binary))
        .route("/text", get(text))
        .route("/malformed", get(malformed))
        .route("/empty", any(empty))
        .with_state(attempts)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub fn binary_payload() -> Vec<u8> {
    (0..BINARY_LEN).map(|i| (i % 251) as u8).collect()
}

async fn echo(
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    tracing::debug!(%method, %uri, "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    (
        status,
        Json(json!({
            "errorCode": status.canonical_reason().unwrap_or("UNKNOWN"),
            "status": code,
        })),
    )
        .into_response()
}

async fn flaky(
    State(attempts): State<Attempts>,
    Path(key): Path<String>,
    Query(params): Query<FlakyParams>,
) -> Response {
    let attempt = {
        let mut attempts = attempts.write().await;
        let count = attempts.entry(key.clone()).or_insert(0);
        *count += 1;
        *count
    };
    if attempt <= params.failures {
        tracing::debug!(%key, attempt, "failing on purpose");
        let status = StatusCode::from_u16(params.status).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        let mut response = (status, "try again later").into_response();
        if let Some(retry_after) = params.retry_after.and_then(|v| v.parse::<HeaderValue>().ok()) {
            response.headers_mut().insert(header::RETRY_AFTER, retry_after);
        }
        return response;
    }
    Json(json!({ "key": key, "attempts": attempt })).into_response()
}

async fn binary() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        binary_payload(),
    )
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "Hello, world!")
}

async fn malformed() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "Hello, world!")
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}
