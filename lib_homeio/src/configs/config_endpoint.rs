//! Endpoint configuration: where the backend lives and how eagerly live
//! series re-fetch. Loaded from an optional JSON5 file, then overridden by
//! environment variables so deployments can retarget without editing files.

use std::path::Path;
use std::{env, fmt, fs};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment override for the backend host.
pub const ENV_HOST: &str = "HOMEIO_HOST";
/// Environment override for the backend port.
pub const ENV_PORT: &str = "HOMEIO_PORT";
/// Environment override for the minimum series re-fetch interval (seconds).
pub const ENV_REFETCH: &str = "HOMEIO_REFETCH_MIN_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(String),

    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("invalid base URL composed from host/port: {0}")]
    UrlError(#[from] url::ParseError),
}

/// Base endpoint of the backend plus the staleness tunable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Host name or address of the backend.
    pub host: String,
    /// Optional TCP port; omitted means the scheme default.
    pub port: Option<u16>,
    /// Minimum elapsed seconds before a push event may trigger a series
    /// re-fetch for a live-tracking series.
    pub refetch_min_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            refetch_min_secs: 60,
        }
    }
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

impl EndpointConfig {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Composes the base URL all transport paths are joined against.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };
        Ok(Url::parse(&format!("http://{}/", authority))?)
    }

    /// Loads the configuration: file (when given and present), then
    /// environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.is_file() => {
                let text = fs::read_to_string(p)?;
                json5::from_str(&text).map_err(|e| ConfigError::ParseError(e.to_string()))?
            }
            _ => Self::default(),
        };

        if let Ok(host) = env::var(ENV_HOST) {
            config.host = host;
        }
        if let Ok(port) = env::var(ENV_PORT) {
            config.port = Some(port.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("{}='{}'", ENV_PORT, port))
            })?);
        }
        if let Ok(secs) = env::var(ENV_REFETCH) {
            config.refetch_min_secs = secs.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("{}='{}'", ENV_REFETCH, secs))
            })?;
        }

        Ok(config)
    }
}
