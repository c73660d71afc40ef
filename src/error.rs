//! Error taxonomy shared by the gateway, session and config layers.

use std::path::PathBuf;
use thiserror::Error;

/// Classified failure of a call against the remote review service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// HTTP 429 from the service.
    #[error("quota exceeded")]
    QuotaExceeded,
    /// DNS, connect, or timeout failure before a response arrived.
    #[error("service unreachable: {0}")]
    Transport(String),
    /// Non-2xx (other than 429) status, or a 2xx body that did not parse.
    #[error("{}", server_message(*status, detail))]
    Server { status: Option<u16>, detail: String },
}

fn server_message(status: Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("service error {code}: {detail}"),
        None => format!("malformed service response: {detail}"),
    }
}

impl GatewayError {
    pub fn is_quota(&self) -> bool {
        matches!(self, GatewayError::QuotaExceeded)
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        GatewayError::Server {
            status: None,
            detail: detail.into(),
        }
    }
}

/// Registration failed; always retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("system is waking up, retry in ~30s ({0})")]
    Unavailable(#[source] GatewayError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid base URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
}
