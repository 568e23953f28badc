use std::time::Duration;

use shared_types::ResponseEnvelope;
use tokio::time::{timeout_at, Instant};

use crate::error::{RelayError, TransportFailureKind};
use crate::request::{OutboundRequest, RelayInput};
use crate::response::transform_response;

pub type Client = reqwest::Client;

/// Executes relay requests. Holds no per-request state, so clones can serve
/// any number of concurrent calls.
#[derive(Clone, Debug)]
pub struct Relay {
    client: Client,
    timeout: Duration,
}

impl Relay {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn execute(&self, input: RelayInput) -> Result<ResponseEnvelope, RelayError> {
        let req = OutboundRequest::try_from(input)?;
        let target = req.url.clone();
        let method = req.method.clone();

        let envelope = self.send(req).await?;

        tracing::debug!(
            "Relay {} {} --> {} in {}ms",
            method,
            target,
            envelope.status,
            envelope.duration
        );

        Ok(envelope)
    }

    async fn send(&self, req: OutboundRequest) -> Result<ResponseEnvelope, TransportFailureKind> {
        let headers = req.header_map()?;
        let mut builder = self
            .client
            .request(req.method, req.url)
            .headers(headers);
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        // one deadline covers both the headers and the body
        let started = Instant::now();
        let deadline = started + self.timeout;
        let maybe_response = timeout_at(deadline, builder.send()).await;
        let duration = started.elapsed().as_millis() as u64;

        let response = match maybe_response {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                tracing::debug!("Outbound call failed: {:?}", err);
                return Err(TransportFailureKind::classify(&err));
            }
            Err(_) => return Err(TransportFailureKind::Timeout),
        };

        match timeout_at(deadline, transform_response(response, duration)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!("Body not received within {:?}", self.timeout);
                Err(TransportFailureKind::Timeout)
            }
        }
    }
}
