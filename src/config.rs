use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Relay {
    /// Upper bound on waiting for the target server, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for Relay {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub relay: Relay,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            relay: Relay::default(),
        }
    }
}
