//! Transport-level failures talking to the runtime API.

use thiserror::Error;

const MAX_BODY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout, or a broken body stream.
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("invalid JSON in HTTP {status} response: {source}")]
    Decode {
        status: u16,
        source: serde_json::Error,
    },

    /// Non-success status on an endpoint whose error body we cannot interpret.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    pub(crate) fn status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let body = if body.chars().count() > MAX_BODY_CHARS {
            let cut: String = body.chars().take(MAX_BODY_CHARS).collect();
            format!("{cut}…")
        } else {
            body.to_string()
        };
        TransportError::Status { status, body }
    }
}
