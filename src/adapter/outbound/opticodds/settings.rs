//! OpticOdds provider configuration.

use serde::Deserialize;

/// Environment variable holding the API key. The key is never read from the
/// config file.
pub const API_KEY_ENV: &str = "OPTICODDS_API_KEY";

/// Endpoints and HTTP behaviour for the OpticOdds API.
#[derive(Debug, Clone, Deserialize)]
pub struct OpticOddsConfig {
    /// REST base for catalog lookups.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Base of the server-sent odds stream; the sport is appended.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// Timeout for catalog requests in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout for every request in milliseconds.
    #[serde(default = "default_http_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Include fixture status updates in the stream.
    #[serde(default)]
    pub include_fixture_updates: bool,
    /// Loaded from [`API_KEY_ENV`].
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_api_url() -> String {
    "https://api.opticodds.com/api/v3".into()
}

fn default_stream_url() -> String {
    "https://api.opticodds.com/api/v3/stream/odds".into()
}

const fn default_http_timeout_ms() -> u64 {
    10000
}

const fn default_http_connect_timeout_ms() -> u64 {
    5000
}

impl Default for OpticOddsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            stream_url: default_stream_url(),
            timeout_ms: default_http_timeout_ms(),
            connect_timeout_ms: default_http_connect_timeout_ms(),
            include_fixture_updates: false,
            api_key: None,
        }
    }
}
