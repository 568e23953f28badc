use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use shared_types::KeyValuePair;
use url::Url;

use crate::error::{RelayError, TransportFailureKind, INVALID_URL, URL_REQUIRED};

/// Request description as received on the wire.
///
/// Fields are loose so that a missing or non-string `url` still produces a
/// "URL is required" envelope instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelayInput {
    pub url: Option<serde_json::Value>,
    pub method: Option<String>,
    pub headers: Vec<KeyValuePair>,
    pub body: Option<String>,
}

/// A validated request, ready to be dispatched.
#[derive(Debug)]
pub struct OutboundRequest {
    pub url: Url,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TryFrom<RelayInput> for OutboundRequest {
    type Error = RelayError;

    fn try_from(input: RelayInput) -> Result<Self, Self::Error> {
        let url = match input.url {
            Some(serde_json::Value::String(url)) => normalize_url(&url)?,
            _ => return Err(RelayError::Invalid(URL_REQUIRED.to_string())),
        };
        let method = normalize_method(input.method.as_deref())?;
        let headers = normalize_headers(&method, &input.headers);
        let body = if has_body(&method) { input.body } else { None };

        Ok(OutboundRequest {
            url,
            method,
            headers,
            body,
        })
    }
}

impl OutboundRequest {
    /// Keys differing only in case are distinct rows and are all sent, in
    /// order, as values of the same header.
    pub fn header_map(&self) -> Result<HeaderMap, TransportFailureKind> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                TransportFailureKind::Other(format!("Invalid header name: {}", key))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                TransportFailureKind::Other(format!("Invalid value for header {}", key))
            })?;
            map.append(name, value);
        }
        Ok(map)
    }
}

/// Trims the url and defaults it to https when no scheme is given.
pub fn normalize_url(raw: &str) -> Result<Url, RelayError> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&candidate).map_err(|err| {
        tracing::debug!("Failed to parse {:?}: {}", candidate, err);
        RelayError::Invalid(INVALID_URL.to_string())
    })
}

pub fn normalize_method(raw: Option<&str>) -> Result<Method, RelayError> {
    let raw = match raw.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_ascii_uppercase(),
        _ => return Ok(Method::GET),
    };
    Method::from_bytes(raw.as_bytes())
        .map_err(|_| RelayError::Invalid(format!("Invalid HTTP method: {}", raw)))
}

pub fn has_body(method: &Method) -> bool {
    *method != Method::GET && *method != Method::HEAD
}

/// Builds the outbound header list.
///
/// Disabled rows and rows with an empty key or value are dropped. Requests
/// without a body never carry `Content-Type` or `Content-Length`. Later rows
/// overwrite earlier rows with the same literal key, keeping the position of
/// the first one.
pub fn normalize_headers(method: &Method, pairs: &[KeyValuePair]) -> Vec<(String, String)> {
    let bodiless = !has_body(method);
    let mut headers: Vec<(String, String)> = Vec::with_capacity(pairs.len());

    for pair in pairs {
        if !pair.enabled || pair.key.is_empty() || pair.value.is_empty() {
            continue;
        }
        if bodiless
            && (pair.key.eq_ignore_ascii_case("content-type")
                || pair.key.eq_ignore_ascii_case("content-length"))
        {
            continue;
        }

        match headers.iter_mut().find(|(key, _)| key == &pair.key) {
            Some(existing) => existing.1 = pair.value.clone(),
            None => headers.push((pair.key.clone(), pair.value.clone())),
        }
    }

    headers
}
