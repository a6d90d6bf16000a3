use console_api::ConsoleApiError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VpsApiError {
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),

    #[error("malformed API response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// The envelope reported `status: false`.
    #[error("API error: {0}")]
    Api(String),

    #[error("API response is missing '{0}'")]
    MissingField(&'static str),

    #[error(transparent)]
    Expiration(#[from] ConsoleApiError),
}
