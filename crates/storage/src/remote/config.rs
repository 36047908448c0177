use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub const ENV_BACKEND_URL: &str = "STUDY_BACKEND_URL";
pub const ENV_BACKEND_KEY: &str = "STUDY_BACKEND_KEY";
pub const ENV_ACCESS_TOKEN: &str = "STUDY_ACCESS_TOKEN";
pub const ENV_RPC_TIMEOUT_SECS: &str = "STUDY_RPC_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("backend url must use http or https, got {0}")]
    UnsupportedScheme(String),
    #[error("invalid STUDY_RPC_TIMEOUT_SECS value: {0}")]
    InvalidTimeout(String),
}

/// Connection settings for the remote backend.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: Url,
    pub api_key: String,
    /// Signed-in user's token; the anonymous key is sent when absent.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl RemoteConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if the url cannot be parsed or is not http(s).
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url.trim())?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.scheme().to_string()));
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read settings from `STUDY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when url or key are unset, or a parse error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = required(ENV_BACKEND_URL)?;
        let api_key = required(ENV_BACKEND_KEY)?;
        let timeout = match env::var(ENV_RPC_TIMEOUT_SECS) {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => {
                info!("{ENV_RPC_TIMEOUT_SECS} not set, using default: {DEFAULT_TIMEOUT_SECS}s");
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        };

        Ok(Self::new(&base_url, api_key)?
            .with_access_token(env::var(ENV_ACCESS_TOKEN).ok())
            .with_timeout(timeout))
    }

    /// Bearer token for requests: the user's token if present, else the api key.
    #[must_use]
    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

/// Whole seconds, at least one; a zero timeout would fail every call.
fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            warn!("Environment variable {key} not found");
            Err(ConfigError::Missing(key))
        }
    }
}
