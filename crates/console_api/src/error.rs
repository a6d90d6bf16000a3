use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleApiError {
    #[error("invalid console router URL: {0}")]
    InvalidEndpoint(String),

    #[error("invalid token expiration '{value}': {message}")]
    InvalidExpiration { value: String, message: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),

    #[error("malformed console response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("invalid console payload: {0}")]
    InvalidPayload(String),

    #[error("retry exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<ConsoleApiError>,
    },
}

impl ConsoleApiError {
    /// The error that ended the final attempt, unwrapping retry bookkeeping.
    pub fn root(&self) -> &ConsoleApiError {
        match self {
            Self::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Human-readable message for a non-success response.
///
/// Falls back to the canonical reason phrase when the body is empty.
pub fn status_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
