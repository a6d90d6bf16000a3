use std::time::Duration;

use clap::Parser;
use console_api::ConsoleApiConfig;
use vps_api::{VpsApiConfig, DEFAULT_API_URL};

/// Open VPS remote console
#[derive(Debug, Parser)]
#[command(name = "remote_console", version)]
pub struct Cli {
    #[arg(value_name = "VPS_ID")]
    pub vps_id: Option<u64>,

    /// How often send and receive data, defaults to 50 ms
    #[arg(long = "refresh-rate", value_name = "MSEC", default_value_t = 50)]
    pub refresh_rate: u64,

    /// Retry a failed console request up to N times before giving up
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub retries: u32,

    /// Per-request timeout for API and console requests
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// VPS management API
    #[arg(long, value_name = "URL", env = "VPS_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Existing API auth token, sent as-is
    #[arg(long, value_name = "TOKEN", env = "VPS_API_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Console router URL; skips VPS lookup (needs --token)
    #[arg(long, value_name = "URL", requires = "token")]
    pub endpoint: Option<String>,

    /// Pre-issued console token (needs --endpoint and --expiration)
    #[arg(long, value_name = "TOKEN", requires_all = ["endpoint", "expiration"])]
    pub token: Option<String>,

    /// Expiration of the pre-issued console token, RFC 3339
    #[arg(long, value_name = "TIME", requires = "token")]
    pub expiration: Option<String>,
}

/// A console token obtained outside this program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preissued {
    pub endpoint: String,
    pub token: String,
    pub expiration: String,
}

impl Cli {
    pub fn refresh_rate(&self) -> Duration {
        Duration::from_millis(self.refresh_rate)
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn preissued(&self) -> Option<Preissued> {
        match (&self.endpoint, &self.token, &self.expiration) {
            (Some(endpoint), Some(token), Some(expiration)) => Some(Preissued {
                endpoint: endpoint.clone(),
                token: token.clone(),
                expiration: expiration.clone(),
            }),
            _ => None,
        }
    }

    pub fn api_config(&self) -> VpsApiConfig {
        let mut config = VpsApiConfig::new(&self.api_url);
        if let Some(token) = &self.auth_token {
            config = config.with_auth_token(token);
        }
        if let Some(timeout) = self.request_timeout() {
            config = config.with_timeout(timeout);
        }
        config
    }

    pub fn console_config(&self, endpoint: &str, vps_id: u64) -> ConsoleApiConfig {
        let config = ConsoleApiConfig::new(endpoint, vps_id).with_max_retries(self.retries);
        match self.request_timeout() {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }
}
