use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ConsoleApiError;
use crate::url::feed_url;

/// Everything the poll loop needs to talk to one console.
///
/// Produced once by whoever issued the console token; never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleSessionInfo {
    pub token: String,
    pub expiration: OffsetDateTime,
    /// Console router base URL.
    pub endpoint: String,
    pub target_id: u64,
}

impl ConsoleSessionInfo {
    pub fn new(
        token: impl Into<String>,
        expiration: OffsetDateTime,
        endpoint: impl Into<String>,
        target_id: u64,
    ) -> Self {
        Self {
            token: token.into(),
            expiration,
            endpoint: endpoint.into(),
            target_id,
        }
    }

    pub fn feed_url(&self) -> Result<String, ConsoleApiError> {
        feed_url(&self.endpoint, self.target_id)
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expiration
    }
}

/// Parse an RFC 3339 token expiration timestamp.
pub fn parse_expiration(value: &str) -> Result<OffsetDateTime, ConsoleApiError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).map_err(|err| {
        ConsoleApiError::InvalidExpiration {
            value: value.to_string(),
            message: err.to_string(),
        }
    })
}
