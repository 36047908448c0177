use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::RemoteConfig;
use crate::repository::StorageError;

/// Errors emitted by `RpcClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RpcError {
    #[error("invalid procedure name: {0:?}")]
    InvalidName(String),
    #[error("{name} failed with status {status}: {message}")]
    Status {
        name: String,
        status: StatusCode,
        message: String,
    },
    #[error("could not decode {name} response: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<RpcError> for StorageError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Status { status, .. } if status == StatusCode::NOT_FOUND => {
                StorageError::NotFound
            }
            RpcError::Status {
                status, message, ..
            } => StorageError::Remote {
                status: status.as_u16(),
                message,
            },
            RpcError::Decode { .. } => StorageError::Serialization(err.to_string()),
            RpcError::InvalidName(_) | RpcError::Url(_) | RpcError::Http(_) => {
                StorageError::Connection(err.to_string())
            }
        }
    }
}

/// Invokes named remote procedures with JSON parameters.
#[derive(Clone, Debug)]
pub struct RpcClient {
    http: Client,
    config: RemoteConfig,
}

impl RpcClient {
    /// # Errors
    ///
    /// Returns `RpcError::Http` if the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> Result<Self, RpcError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, name: &str) -> Result<url::Url, RpcError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(RpcError::InvalidName(name.to_string()));
        }
        let base = self.config.base_url.as_str().trim_end_matches('/');
        Ok(url::Url::parse(&format!("{base}/rest/v1/rpc/{name}"))?)
    }

    /// Call procedure `name` with `params` and decode its JSON result.
    ///
    /// # Errors
    ///
    /// Returns `RpcError` for invalid names, transport failures, non-success
    /// statuses, or bodies that do not decode into `R`.
    pub async fn call<P, R>(&self, name: &str, params: &P) -> Result<R, RpcError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(name)?;
        debug!(procedure = name, "calling remote procedure");

        let response = self
            .http
            .post(url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.config.bearer())
            .json(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body, status);
            warn!(procedure = name, %status, "remote procedure failed: {message}");
            return Err(RpcError::Status {
                name: name.to_string(),
                status,
                message,
            });
        }

        // Procedures returning void answer with an empty body.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|source| RpcError::Decode {
            name: name.to_string(),
            source,
        })
    }
}

/// Prefer the backend's JSON `message`, then the raw body, then the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned));
    if let Some(message) = from_json {
        return message;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RpcClient {
        RpcClient::new(RemoteConfig::new(base, "anon").unwrap()).unwrap()
    }

    #[test]
    fn endpoint_appends_rpc_path() {
        let url = client("https://db.example.com/").endpoint("get_study_set_items").unwrap();
        assert_eq!(
            url.as_str(),
            "https://db.example.com/rest/v1/rpc/get_study_set_items"
        );
    }

    #[test]
    fn endpoint_rejects_path_like_names() {
        let err = client("https://db.example.com").endpoint("../admin").unwrap_err();
        assert!(matches!(err, RpcError::InvalidName(_)));
    }

    #[test]
    fn error_message_prefers_json_message() {
        let msg = error_message(r#"{"message":"set is private","code":"42501"}"#, StatusCode::FORBIDDEN);
        assert_eq!(msg, "set is private");
        assert_eq!(error_message("  ", StatusCode::BAD_GATEWAY), "Bad Gateway");
        assert_eq!(error_message("boom", StatusCode::INTERNAL_SERVER_ERROR), "boom");
    }

    #[test]
    fn not_found_status_maps_to_storage_not_found() {
        let err = RpcError::Status {
            name: "get_study_set_items".into(),
            status: StatusCode::NOT_FOUND,
            message: "missing".into(),
        };
        assert!(matches!(StorageError::from(err), StorageError::NotFound));
    }
}
