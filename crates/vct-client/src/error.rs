//! Client error types.
//!
//! Every operation error carries the operation name so that a log refusal
//! reads exactly `"<operation>: <message>"`.

use thiserror::Error;

/// Failures below the HTTP layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or body failure reported by reqwest.
    #[error(transparent)]
    Request(reqwest::Error),

    /// The trust store could not produce a root pool.
    #[error("trust store: {0}")]
    Tls(#[from] vct_tls::TlsError),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(e)
        }
    }
}

/// Errors from log client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The log answered non-2xx with a `{"message": ...}` body.
    #[error("{operation}: {message}")]
    Server {
        operation: &'static str,
        message: String,
    },

    /// The log answered non-2xx without a decodable error body.
    #[error("{operation}: unexpected status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The request never produced a response.
    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// A 2xx body did not match the expected shape.
    #[error("{operation}: decode response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The caller cancelled the operation.
    #[error("{operation}: cancelled")]
    Cancelled { operation: &'static str },

    /// The request URL or headers could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// The operation that failed, when the error is tied to one.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Server { operation, .. }
            | Self::Status { operation, .. }
            | Self::Transport { operation, .. }
            | Self::Decode { operation, .. }
            | Self::Cancelled { operation } => Some(*operation),
            Self::InvalidRequest(_) => None,
        }
    }

    /// Whether the log itself rejected the request.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Status { .. })
    }
}
