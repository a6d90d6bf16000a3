use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("vps_console/", env!("CARGO_PKG_VERSION"));

/// Transport configuration for console feed requests.
#[derive(Debug, Clone)]
pub struct ConsoleApiConfig {
    /// Console router base URL, as reported by the VPS location.
    pub endpoint: String,
    /// Identifier of the VPS whose console is relayed.
    pub vps_id: u64,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
    /// Additional attempts after a retryable failure. Zero keeps fail-fast behavior.
    pub max_retries: u32,
    pub user_agent: String,
}

impl ConsoleApiConfig {
    pub fn new(endpoint: impl Into<String>, vps_id: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            vps_id,
            timeout: None,
            max_retries: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
