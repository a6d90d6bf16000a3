use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.vpsfree.cz";
pub const DEFAULT_API_VERSION: &str = "6.0";
/// Header carrying a pre-issued API token.
pub const AUTH_TOKEN_HEADER: &str = "X-HaveAPI-Auth-Token";

const DEFAULT_USER_AGENT: &str = concat!("vps_console/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct VpsApiConfig {
    pub base_url: String,
    pub version: String,
    /// Passed through as [`AUTH_TOKEN_HEADER`]; never obtained here.
    pub auth_token: Option<String>,
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl VpsApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            version: DEFAULT_API_VERSION.to_string(),
            auth_token: None,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for VpsApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
