//! File-backed tracing setup.
//!
//! Stdout is the raw console, so log records never go there. When logging is
//! enabled they are appended to a file instead.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;

pub const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_DIR: &str = ".vps_console";
const DEFAULT_LOG_FILE: &str = "console.log";

/// Where records go and which ones, or `None` when logging is off.
pub fn log_target(config: &EnvConfig) -> Option<(PathBuf, String)> {
    if !config.logging_enabled() {
        return None;
    }

    let filter = config
        .log_filter
        .clone()
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());
    let path = config.log_file.clone().unwrap_or_else(default_log_path);
    Some((path, filter))
}

fn default_log_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

/// Install the global subscriber. Returns the log path when logging is active.
///
/// A second call, or a call after another subscriber was installed, leaves the
/// existing one in place.
pub fn init(config: &EnvConfig) -> io::Result<Option<PathBuf>> {
    let Some((path, filter)) = log_target(config) else {
        return Ok(None);
    };

    let filter = EnvFilter::try_new(&filter)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vps_console logging started");

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_filter_or_file() {
        assert_eq!(log_target(&EnvConfig::default()), None);
    }

    #[test]
    fn filter_alone_uses_default_path() {
        let config = EnvConfig {
            log_filter: Some("debug".to_string()),
            ..EnvConfig::default()
        };
        let (path, filter) = log_target(&config).expect("enabled");
        assert_eq!(filter, "debug");
        assert!(path.ends_with("console.log"));
    }

    #[test]
    fn file_alone_uses_default_filter() {
        let config = EnvConfig {
            log_file: Some(PathBuf::from("/tmp/vps.log")),
            ..EnvConfig::default()
        };
        assert_eq!(
            log_target(&config),
            Some((PathBuf::from("/tmp/vps.log"), DEFAULT_FILTER.to_string()))
        );
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let dir = std::env::temp_dir().join(format!("vps_console_log_{}", std::process::id()));
        let config = EnvConfig {
            log_filter: Some("vps_console=[".to_string()),
            log_file: Some(dir.join("bad.log")),
            ..EnvConfig::default()
        };
        let err = init(&config).expect_err("bad filter");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(!dir.exists());
    }
}
