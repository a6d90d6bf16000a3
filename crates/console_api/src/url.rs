use url::Url;

use crate::error::ConsoleApiError;

/// Path prefix of the console feed endpoint on the console router.
pub const FEED_PATH: &str = "/console/feed";

/// Build the feed endpoint for `vps_id` on the given console router.
///
/// Trailing slashes on the router URL are ignored. Only `http` and `https`
/// routers are accepted.
pub fn feed_url(server: &str, vps_id: u64) -> Result<String, ConsoleApiError> {
    let trimmed = server.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConsoleApiError::InvalidEndpoint(
            "console router URL is empty".to_owned(),
        ));
    }

    let url = format!("{trimmed}{FEED_PATH}/{vps_id}");
    let parsed =
        Url::parse(&url).map_err(|err| ConsoleApiError::InvalidEndpoint(format!("{trimmed}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConsoleApiError::InvalidEndpoint(format!(
            "unsupported scheme '{other}' in {trimmed}"
        ))),
    }
}
