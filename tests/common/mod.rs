use std::net::{SocketAddr, TcpListener};
use std::sync::Once;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::sleep;
use tower::util::ServiceExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postie::config::{Config, Relay};
use shared_types::ResponseEnvelope;

static TRACING_INITIALIZED: Once = Once::new();

// Help function to add tracing to tests
// Note: This is safe to use for multiple tests, but since tests are run concurrently the
// output may be interleaved
#[allow(dead_code)]
pub fn enable_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "postie=trace".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}

pub fn config(timeout_ms: u64) -> Config {
    Config {
        listen: "127.0.0.1:0".to_string(),
        relay: Relay { timeout_ms },
    }
}

pub async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    addr
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

async fn json_handler() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/json; charset=utf-8")],
        r#"{"a":1}"#,
    )
}

async fn broken_json_handler() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], "{oops")
}

async fn text_handler() -> impl IntoResponse {
    "Hello, World!"
}

async fn missing_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing here")
}

async fn slow_handler() -> impl IntoResponse {
    sleep(Duration::from_millis(500)).await;
    "We shouldn't see this"
}

/// Sends the headers and a first chunk, then never finishes the body.
async fn stall_handler() -> Response {
    let (mut sender, body) = hyper::Body::channel();
    tokio::spawn(async move {
        let _ = sender.send_data("partial".into()).await;
        sleep(Duration::from_secs(5)).await;
        drop(sender);
    });

    let mut response = Response::new(axum::body::boxed(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

async fn echo_handler(method: Method, headers: HeaderMap, body: String) -> impl IntoResponse {
    let headers: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                serde_json::Value::String(v.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();
    Json(serde_json::json!({
        "method": method.as_str(),
        "headers": headers,
        "body": body,
    }))
}

pub fn origin() -> Router {
    Router::new()
        .route("/json", get(json_handler))
        .route("/broken-json", get(broken_json_handler))
        .route("/text", get(text_handler))
        .route("/missing", get(missing_handler))
        .route("/slow", get(slow_handler))
        .route("/stall", get(stall_handler))
        .route("/echo", any(echo_handler))
}

/// Answers every connection with the same raw HTTP/1.1 response.
#[allow(dead_code)]
pub async fn spawn_raw(response: &'static str) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// Posts `payload` to the relay router and decodes the envelope.
#[allow(dead_code)]
pub async fn relay(app: &Router, payload: String) -> (StatusCode, ResponseEnvelope) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(postie::RELAY_PATH)
                .header("Content-Type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let envelope: ResponseEnvelope = serde_json::from_slice(&body).unwrap();
    (status, envelope)
}
