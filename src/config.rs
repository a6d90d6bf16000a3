//! Environment configuration.

use std::env;
use std::path::PathBuf;

pub const LOG_FILTER_VAR: &str = "VPS_CONSOLE_LOG";
pub const LOG_FILE_VAR: &str = "VPS_CONSOLE_LOG_FILE";
pub const WRITE_LOG_VAR: &str = "VPS_CONSOLE_WRITE_LOG";

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    /// `EnvFilter` directives, e.g. `info` or `vps_console=trace,console_api=debug`.
    pub log_filter: Option<String>,
    pub log_file: Option<PathBuf>,
    /// Tee of everything written to the local display.
    pub write_log: Option<PathBuf>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            log_filter: env_string_opt(LOG_FILTER_VAR),
            log_file: env_string_opt(LOG_FILE_VAR).map(PathBuf::from),
            write_log: env_string_opt(WRITE_LOG_VAR).map(PathBuf::from),
        }
    }

    /// Logging is enabled when either a filter or a log file is configured.
    pub fn logging_enabled(&self) -> bool {
        self.log_filter.is_some() || self.log_file.is_some()
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
