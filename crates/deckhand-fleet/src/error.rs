//! Fleet client error types.

use thiserror::Error;

/// Errors returned by fleet API calls.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("invalid fleet endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to connect to fleet at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fleet request failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid fleet request: {0}")]
    Request(#[from] http::Error),

    #[error("fleet request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("fleet returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed fleet response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type FleetResult<T> = Result<T, FleetError>;
