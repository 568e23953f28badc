use std::error::Error as StdError;
use std::fmt;
use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared_types::ResponseEnvelope;

pub const URL_REQUIRED: &str = "URL is required";
pub const INVALID_URL: &str =
    "Invalid URL format. Please enter a valid URL (e.g., https://api.example.com)";

/// Why an outbound call produced no usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailureKind {
    DnsFailure,
    ConnectionRefused,
    Timeout,
    Other(String),
}

impl TransportFailureKind {
    pub fn message(&self) -> String {
        match self {
            TransportFailureKind::DnsFailure => {
                "Could not resolve hostname. Please check the URL and try again.".to_string()
            }
            TransportFailureKind::ConnectionRefused => {
                "Connection refused. The server may be down or unreachable.".to_string()
            }
            TransportFailureKind::Timeout => {
                "Request timeout. The server took too long to respond.".to_string()
            }
            TransportFailureKind::Other(message) if message.trim().is_empty() => {
                "Failed to make request".to_string()
            }
            TransportFailureKind::Other(message) => message.clone(),
        }
    }

    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportFailureKind::Timeout;
        }
        classify_chain(err).unwrap_or_else(|| TransportFailureKind::Other(err.to_string()))
    }
}

/// Walks the source chain looking for a resolver or socket error.
pub fn classify_chain(err: &(dyn StdError + 'static)) -> Option<TransportFailureKind> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => {
                    return Some(TransportFailureKind::ConnectionRefused)
                }
                io::ErrorKind::TimedOut => return Some(TransportFailureKind::Timeout),
                _ => {}
            }
        }

        // hyper reports resolver failures as "dns error", getaddrinfo as
        // "failed to lookup address information"
        let text = err.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return Some(TransportFailureKind::DnsFailure);
        }

        current = err.source();
    }
    None
}

#[derive(Debug)]
pub enum RelayError {
    /// The request description was rejected before any network attempt.
    Invalid(String),
    /// The outbound call or the reading of its response failed.
    Transport(TransportFailureKind),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Invalid(_) => StatusCode::BAD_REQUEST,
            RelayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RelayError::Invalid(message) => message.clone(),
            RelayError::Transport(kind) => kind.message(),
        }
    }

    pub fn envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::error(self.message())
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl StdError for RelayError {}

impl From<TransportFailureKind> for RelayError {
    fn from(kind: TransportFailureKind) -> Self {
        RelayError::Transport(kind)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            RelayError::Invalid(message) => tracing::warn!("Rejected relay request: {}", message),
            RelayError::Transport(kind) => tracing::error!("Relay call failed: {:?}", kind),
        }
        (self.status_code(), Json(self.envelope())).into_response()
    }
}
