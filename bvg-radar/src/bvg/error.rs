//! BVG client error types.
//!
//! Only faults the caller has to react to end up here. Rate limiting and
//! upstream error statuses are reported as "no result" by the client
//! instead (see [`BvgClient::call`](super::BvgClient::call)).

/// Transport and decoding faults from the BVG HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum BvgError {
    /// HTTP request failed (connection refused, timeout, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A successful response carried a body that is not the expected JSON
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Client configuration is unusable
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl BvgError {
    /// Build a `Json` error, keeping a bounded excerpt of the offending body.
    pub(crate) fn json(err: &serde_json::Error, body: &str) -> Self {
        BvgError::Json {
            message: err.to_string(),
            body: Some(body.chars().take(500).collect()),
        }
    }

    /// Whether this is a network-level failure rather than a bad payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, BvgError::Http(_))
    }
}
