use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default per-request timeout when neither the dispatch call nor the
/// configuration file supplies one.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// A proxy endpoint. Routing through a proxy changes the TCP destination;
/// the original target stays in the request line and headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyServer {
    pub host: String,
    pub port: u16,
}

impl ProxyServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Process-wide client configuration.
///
/// Owned by the `Client` at construction time and shared read-only with
/// every dispatch. Loadable from a YAML file named by the `COURIER_CONFIG`
/// environment variable, or built programmatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Advertise `Accept-Encoding: gzip` and decode compressed response
    /// bodies before they reach the handler.
    #[serde(default)]
    pub compression_enabled: bool,

    /// Default request timeout, applied when a dispatch passes
    /// `Duration::ZERO`.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Default proxy for every request without a per-request override.
    #[serde(default)]
    pub proxy: Option<ProxyServer>,

    /// Headers added to every outbound request unless the request already
    /// carries the same header name.
    #[serde(default)]
    pub default_headers: Vec<(String, String)>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            compression_enabled: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            proxy: None,
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the file named by `COURIER_CONFIG`, falling
    /// back to defaults when the variable is unset.
    pub fn load() -> Result<Self, Error> {
        match std::env::var("COURIER_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("cannot read {}: {}", path, e)))?;
                Self::from_yaml(&raw)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parses configuration from a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self, Error> {
        serde_yaml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
