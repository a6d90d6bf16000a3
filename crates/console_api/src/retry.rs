use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ConsoleApiError;

/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 250;
/// Upper bound for a single backoff step.
pub const MAX_DELAY_MS: u64 = 4000;

fn retryable_text_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)bad.?gateway|service.?unavailable|upstream.?connect|connection.?refused")
            .expect("retry regex must compile")
    })
}

/// Status/body policy for transient router failures.
pub fn is_retryable_status(status: u16, body: &str) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504) || retryable_text_regex().is_match(body)
}

/// Whether a failed feed attempt may be repeated.
///
/// Malformed responses are never retried: the router has no way to redeliver
/// an output chunk, so a retry could only duplicate or skip output.
pub fn is_retryable(error: &ConsoleApiError) -> bool {
    match error {
        ConsoleApiError::Request(err) => err.is_connect() || err.is_timeout() || err.is_request(),
        ConsoleApiError::Status(status, body) => is_retryable_status(status.as_u16(), body),
        _ => false,
    }
}

/// Exponential backoff delay for a retry attempt, capped at [`MAX_DELAY_MS`].
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(30);
    let delay = BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(exponent));
    Duration::from_millis(delay.min(MAX_DELAY_MS))
}
