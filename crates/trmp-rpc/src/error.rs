//! API client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP error calling {endpoint} at {url}: {source}")]
    Http {
        endpoint: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {endpoint} at {url}: {body}")]
    HttpStatus {
        endpoint: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("authentication failed at {url}")]
    AuthFailed { url: String },

    /// Structured failure reported inside the response envelope.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("no rpcData in response from {context}")]
    NoResult { context: String },

    #[error("unexpected response from {context}: {message}")]
    Decode { context: String, message: String },
}

impl RpcError {
    /// Connection-level failures and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Http { source, .. } => {
                source.is_connect() || source.is_timeout() || source.is_request()
            }
            RpcError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
