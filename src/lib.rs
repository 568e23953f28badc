pub mod config;
pub mod error;
pub mod relay;
pub mod request;
pub mod response;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use shared_types::ResponseEnvelope;
use tower_http::trace::TraceLayer;

pub use crate::config::Config;
use crate::error::RelayError;
use crate::relay::{Client, Relay};
use crate::request::RelayInput;

pub const RELAY_PATH: &str = "/api/request";

pub fn app(config: &Config) -> Result<Router> {
    let client = Client::builder()
        .no_proxy()
        .build()
        .context("Failed to build outbound HTTP client")?;
    let relay = Relay::new(client, Duration::from_millis(config.relay.timeout_ms));

    Ok(router(relay))
}

pub fn router(relay: Relay) -> Router {
    Router::new()
        .route(RELAY_PATH, post(handler))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

#[tracing::instrument(level = "trace", "relay", skip_all)]
async fn handler(
    State(relay): State<Relay>,
    body: Bytes,
) -> Result<Json<ResponseEnvelope>, RelayError> {
    let input: RelayInput = serde_json::from_slice(&body)
        .map_err(|err| RelayError::Invalid(format!("Invalid request body: {}", err)))?;

    tracing::debug!("{:?}", &input);

    let envelope = relay.execute(input).await?;

    Ok(Json(envelope))
}
