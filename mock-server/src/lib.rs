//! Fixture HTTP server for exercising the engine over real sockets.
//!
//! Routes are deliberately dumb: each one exposes a single behavior the
//! engine's integration tests need to observe — a plain success body, a
//! failure body, an echo that reports the request framing it saw on the
//! wire, a header mirror, and a slow endpoint for timeout coverage. Every
//! response is tagged with a fresh `x-request-id`.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use uuid::Uuid;

/// JSON mirror of the request headers, as received by the server.
#[derive(Debug, Serialize)]
pub struct HeadersEcho {
    pub headers: BTreeMap<String, Vec<String>>,
}

pub fn app() -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/missing", get(missing))
        .route("/echo", post(echo).put(echo))
        .route("/headers", get(headers_mirror))
        .route("/slow", get(slow))
        .layer(middleware::from_fn(tag_request_id))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Stamp every response with a unique id so tests can assert the response
/// they read belongs to the exchange they made.
async fn tag_request_id(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

async fn hello() -> impl IntoResponse {
    ([("content-type", "text/plain")], "hello")
}

async fn missing() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [("content-type", "text/plain")],
        "not found",
    )
}

/// Echo the body back, reporting how the request body was framed
/// (`content-length:<n>` or `chunked`) and which content type arrived.
async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let framing = if headers
        .get("transfer-encoding")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
    {
        "chunked".to_string()
    } else if let Some(length) = headers.get("content-length").and_then(|v| v.to_str().ok()) {
        format!("content-length:{length}")
    } else {
        "none".to_string()
    };

    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    (
        [
            ("x-echo-framing", framing),
            ("x-echo-content-type", content_type),
        ],
        body,
    )
}

async fn headers_mirror(headers: HeaderMap) -> Json<HeadersEcho> {
    let mut mirrored: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        mirrored
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().unwrap_or("").to_string());
    }
    Json(HeadersEcho { headers: mirrored })
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "finally"
}
