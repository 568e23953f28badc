use std::collections::BTreeMap;

use hyper::ext::ReasonPhrase;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Response;
use shared_types::ResponseEnvelope;

use crate::error::TransportFailureKind;

/// Reads the target's response into an envelope.
///
/// JSON content types are parsed; anything else is kept as text.
pub async fn transform_response(
    response: Response,
    duration: u64,
) -> Result<ResponseEnvelope, TransportFailureKind> {
    let status = response.status();
    let status_text = status_text(&response);
    let headers = transform_headers(response.headers());
    let is_json = headers
        .get(CONTENT_TYPE.as_str())
        .map_or(false, |ct| ct.contains("application/json"));

    let text = response
        .text()
        .await
        .map_err(|err| TransportFailureKind::classify(&err))?;

    let data = if is_json {
        serde_json::from_str(&text).map_err(|err| {
            tracing::debug!("Response claimed JSON but failed to parse: {}", err);
            TransportFailureKind::Other(err.to_string())
        })?
    } else {
        serde_json::Value::String(text)
    };

    Ok(ResponseEnvelope {
        status: status.as_u16(),
        status_text,
        headers,
        data,
        duration,
    })
}

/// Reason phrase as received, falling back to the canonical one.
///
/// hyper only keeps the phrase when it differs from the canonical reason.
fn status_text(response: &Response) -> String {
    match response.extensions().get::<ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Folds repeated headers into one comma-separated value.
pub fn transform_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(key.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        let map = transform_headers(&headers);
        assert_eq!(map["set-cookie"], "a=1, b=2");
        assert_eq!(map["content-type"], "text/plain");
    }
}
