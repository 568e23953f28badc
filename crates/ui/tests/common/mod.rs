use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Uri};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};

use postie_ui::composer::{Composer, RelayClient};
use postie_ui::history::MemoryStorage;

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

async fn echo_handler(method: Method, uri: Uri, body: String) -> impl IntoResponse {
    Json(serde_json::json!({
        "method": method.as_str(),
        "query": uri.query(),
        "body": body,
    }))
}

#[allow(dead_code)]
pub fn origin() -> Router {
    Router::new()
        .route("/json", get(json_handler))
        .route("/echo", any(echo_handler))
}

#[allow(dead_code)]
/// Starts a relay and returns a client pointed at it.
pub async fn relay() -> RelayClient {
    let mut config = postie::Config::default();
    config.relay.timeout_ms = 2_000;
    let addr = spawn(postie::app(&config).unwrap()).await;
    relay_at(addr)
}

#[allow(dead_code)]
pub fn relay_at(addr: SocketAddr) -> RelayClient {
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    RelayClient::new(client, format!("http://{}{}", addr, postie::RELAY_PATH))
}

#[allow(dead_code)]
pub fn composer() -> (Composer, MemoryStorage) {
    let storage = MemoryStorage::default();
    (Composer::new(Box::new(storage.clone())), storage)
}
