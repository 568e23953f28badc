//! The request being edited, and the pure updates applied to it.

use std::fmt;

use postie::request::normalize_url;
use shared_types::{HttpMethod, KeyValuePair, RelayRequest, SavedRequest};

/// Body seeded when switching away from GET with an empty body.
pub const BODY_TEMPLATE: &str = "{\n  \n}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    EmptyUrl,
    InvalidJson(String),
    InFlight,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::EmptyUrl => f.write_str("Please enter a URL"),
            SendError::InvalidJson(message) => write!(
                f,
                "Invalid JSON in request body:\n{}\n\nTip: Use double quotes (\") for strings, not single quotes (')",
                message
            ),
            SendError::InFlight => f.write_str("A request is already in progress"),
        }
    }
}

impl std::error::Error for SendError {}

/// Which key/value list a row edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rows {
    Headers,
    QueryParams,
}

/// A single edit to one key/value row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEdit {
    Key(String),
    Value(String),
    Enabled(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<KeyValuePair>,
    pub query_params: Vec<KeyValuePair>,
    pub body: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            method: HttpMethod::Get,
            headers: vec![KeyValuePair::new("Content-Type", "application/json")],
            query_params: Vec::new(),
            body: String::new(),
        }
    }
}

impl Draft {
    /// Switching to GET clears the body; switching away from GET with an
    /// empty body seeds the JSON template.
    pub fn set_method(&mut self, method: HttpMethod) {
        if method == self.method {
            return;
        }
        self.method = method;
        if method == HttpMethod::Get {
            self.body.clear();
        } else if self.body.is_empty() {
            self.body = BODY_TEMPLATE.to_string();
        }
    }

    pub fn rows_mut(&mut self, rows: Rows) -> &mut Vec<KeyValuePair> {
        match rows {
            Rows::Headers => &mut self.headers,
            Rows::QueryParams => &mut self.query_params,
        }
    }

    pub fn add_row(&mut self, rows: Rows) {
        self.rows_mut(rows).push(KeyValuePair::default());
    }

    pub fn edit_row(&mut self, rows: Rows, index: usize, edit: RowEdit) {
        let Some(row) = self.rows_mut(rows).get_mut(index) else {
            return;
        };
        match edit {
            RowEdit::Key(key) => row.key = key,
            RowEdit::Value(value) => row.value = value,
            RowEdit::Enabled(enabled) => row.enabled = enabled,
        }
    }

    pub fn remove_row(&mut self, rows: Rows, index: usize) {
        let rows = self.rows_mut(rows);
        if index < rows.len() {
            rows.remove(index);
        }
    }

    /// Pretty prints the body. On failure the body is left untouched.
    pub fn format_body(&mut self) -> Result<(), String> {
        if !self.method.allows_body() {
            return Ok(());
        }
        let value: serde_json::Value = serde_json::from_str(&self.body)
            .map_err(|err| format!("Cannot format: {}", err))?;
        self.body = serde_json::to_string_pretty(&value)
            .map_err(|err| format!("Cannot format: {}", err))?;
        Ok(())
    }

    pub fn clear_body(&mut self) {
        if self.method.allows_body() {
            self.body = BODY_TEMPLATE.to_string();
        }
    }

    /// The url with enabled, keyed query params appended.
    pub fn effective_url(&self) -> String {
        let params: Vec<String> = self
            .query_params
            .iter()
            .filter(|p| p.enabled && !p.key.is_empty())
            .map(|p| {
                format!(
                    "{}={}",
                    urlencoding::encode(&p.key),
                    urlencoding::encode(&p.value)
                )
            })
            .collect();

        if params.is_empty() {
            return self.url.clone();
        }

        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, params.join("&"))
    }

    /// Checks that run before any relay call.
    pub fn validate(&self) -> Result<(), SendError> {
        if self.url.is_empty() {
            return Err(SendError::EmptyUrl);
        }
        if self.method.allows_body() && !self.body.trim().is_empty() {
            serde_json::from_str::<serde_json::Value>(&self.body)
                .map_err(|err| SendError::InvalidJson(err.to_string()))?;
        }
        Ok(())
    }

    /// Header filtering is left to the relay.
    pub fn to_relay_request(&self) -> RelayRequest {
        let body = if self.method.allows_body() && !self.body.trim().is_empty() {
            Some(self.body.clone())
        } else {
            None
        };

        RelayRequest {
            url: self.effective_url(),
            method: self.method,
            headers: self.headers.clone(),
            body,
        }
    }

    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        format!("{} {}", self.method, url_path(&self.effective_url()))
    }

    pub fn to_saved(&self, id: String, timestamp: i64) -> SavedRequest {
        SavedRequest {
            id,
            name: self.display_name(),
            url: self.url.clone(),
            method: self.method,
            headers: self.headers.clone(),
            query_params: self.query_params.clone(),
            body: self.body.clone(),
            timestamp,
        }
    }
}

impl From<&SavedRequest> for Draft {
    fn from(saved: &SavedRequest) -> Self {
        Self {
            name: saved.name.clone(),
            url: saved.url.clone(),
            method: saved.method,
            headers: saved.headers.clone(),
            query_params: saved.query_params.clone(),
            body: saved.body.clone(),
        }
    }
}

// scheme-less urls get the same https default the relay applies
/// Path of the url the relay would call, or the raw url when it has none.
fn url_path(url: &str) -> String {
    normalize_url(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.trim().to_string())
}
