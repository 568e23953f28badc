use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::Rng;
use shared_types::{RelayRequest, ResponseEnvelope, SavedRequest};

use crate::draft::{Draft, SendError};
use crate::history::{History, Storage};

/// Calls the relay endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Relay-level failures (400/500) still carry an envelope and are `Ok`.
    pub async fn execute(&self, request: &RelayRequest) -> Result<ResponseEnvelope> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach relay at {}", self.endpoint))?;

        let status = response.status();
        let envelope = response
            .json::<ResponseEnvelope>()
            .await
            .with_context(|| format!("Relay answered {} without an envelope", status))?;

        Ok(envelope)
    }
}

/// A send handed to the relay, with the draft it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub request: RelayRequest,
    draft: Draft,
    selected: Option<String>,
}

/// Relay endpoint of a server listening on `listen`.
///
/// Wildcard addresses are reached through the loopback of the same family.
pub fn local_endpoint(listen: SocketAddr) -> String {
    let mut addr = listen;
    if addr.ip().is_unspecified() {
        match addr {
            SocketAddr::V4(_) => addr.set_ip(Ipv4Addr::LOCALHOST.into()),
            SocketAddr::V6(_) => addr.set_ip(Ipv6Addr::LOCALHOST.into()),
        }
    }
    format!("http://{}{}", addr, postie::RELAY_PATH)
}

/// State of the request composer.
pub struct Composer {
    pub draft: Draft,
    pub response: Option<ResponseEnvelope>,
    pub loading: bool,
    pub selected: Option<String>,
    /// Last user-visible message, such as a validation failure.
    pub notice: Option<String>,
    history: History,
    storage: Box<dyn Storage>,
}

impl Composer {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        let history = History::load(storage.as_ref());
        tracing::debug!("Loaded {} saved requests", history.len());

        Self {
            draft: Draft::default(),
            response: None,
            loading: false,
            selected: None,
            notice: None,
            history,
            storage,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Validates the draft and marks a send as in progress.
    ///
    /// On error nothing but the notice changes and no call must be made.
    pub fn begin_send(&mut self) -> Result<PendingSend, SendError> {
        let result = if self.loading {
            Err(SendError::InFlight)
        } else {
            self.draft.validate()
        };

        if let Err(err) = result {
            self.notice = Some(err.to_string());
            return Err(err);
        }

        self.notice = None;
        self.loading = true;
        self.response = None;
        Ok(PendingSend {
            request: self.draft.to_relay_request(),
            draft: self.draft.clone(),
            selected: self.selected.clone(),
        })
    }

    /// Records the outcome of the relay call started by [`Self::begin_send`].
    ///
    /// History gets the draft as it was sent, whatever was edited or loaded
    /// while the call was running.
    pub fn finish_send(&mut self, pending: PendingSend, outcome: Result<ResponseEnvelope>) {
        self.loading = false;

        let envelope = match outcome {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!("Relay call failed: {:?}", err);
                self.response = Some(ResponseEnvelope::error(err.to_string()));
                return;
            }
        };

        let id = pending.selected.clone().unwrap_or_else(new_id);
        let saved = pending.draft.to_saved(id, now_ms());
        match self.save(saved) {
            Ok(id) => {
                self.response = Some(envelope);
                // a request loaded mid-flight keeps its selection
                if self.selected == pending.selected {
                    self.selected = Some(id);
                }
            }
            Err(err) => {
                tracing::error!("Failed to save request: {:?}", err);
                self.response = Some(ResponseEnvelope::error(err.to_string()));
            }
        }
    }

    /// Runs a full send against `relay`.
    pub async fn send(&mut self, relay: &RelayClient) -> Result<(), SendError> {
        let pending = self.begin_send()?;
        let outcome = relay.execute(&pending.request).await;
        self.finish_send(pending, outcome);
        Ok(())
    }

    pub fn load_saved(&mut self, id: &str) -> Option<&SavedRequest> {
        let saved = self.history.get(id)?;
        self.draft = Draft::from(saved);
        self.selected = Some(saved.id.clone());
        Some(saved)
    }

    pub fn delete_saved(&mut self, id: &str) -> Result<()> {
        let mut history = self.history.clone();
        if history.remove(id).is_none() {
            return Ok(());
        }
        history.persist(self.storage.as_ref())?;
        self.history = history;

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(())
    }

    fn save(&mut self, saved: SavedRequest) -> Result<String> {
        let id = saved.id.clone();
        let mut history = self.history.clone();
        history.upsert(saved);
        history.persist(self.storage.as_ref())?;
        self.history = history;
        Ok(id)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn new_id() -> String {
    let suffix: u64 = rand::thread_rng().gen();
    format!("{}-{:016x}", now_ms(), suffix)
}
