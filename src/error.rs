use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::Method;
use std::error::Error as _;
use std::io;

/// Custom error type for gitlab_mr_build_trigger operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Malformed webhook payload: {0}")]
    MalformedInput(String),

    #[error("Webhook validation failed: {0}")]
    WebhookValidationFailed(String),

    #[error("No access token available: pass ?private_token= or configure GITLAB_PRIVATE_TOKEN")]
    MissingToken,

    /// Network-level failure reaching the remote API. `url` is already redacted.
    #[error("{method} {url} failed: {reason}")]
    RemoteTransport {
        method: Method,
        url: String,
        /// Full cause chain, prefixed with "timed out" for timeouts.
        reason: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} resulted in {status}")]
    RemoteRejection {
        method: Method,
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to deserialize response of {method} {url} ({source})")]
    RemoteDecode {
        method: Method,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl BridgeError {
    /// HTTP status surfaced to the webhook caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            BridgeError::WebhookValidationFailed(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wrap a reqwest failure, stripping its URL (which may carry a token)
    /// and keeping the underlying cause so timeouts and refused connections
    /// read differently in the log.
    pub fn transport(method: Method, url: String, error: reqwest::Error) -> Self {
        let source = error.without_url();
        let mut reason = source.to_string();
        let mut cause = source.source();
        while let Some(inner) = cause {
            reason.push_str(": ");
            reason.push_str(&inner.to_string());
            cause = inner.source();
        }
        if source.is_timeout() {
            reason = format!("timed out ({})", reason);
        }
        BridgeError::RemoteTransport {
            method,
            url,
            reason,
            source,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Helper type for Results that use BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
