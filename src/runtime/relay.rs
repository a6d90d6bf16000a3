//! Wires the poll loop to the real terminal for one relay session.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use console_api::{ConsoleSessionInfo, FeedTransport};
use libc::c_int;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::dimensions::TerminalDimensions;
use crate::platform::{
    refresh_dimensions, InputReader, RawModeError, RawModeScope, ResizeWatcher,
    TerminalOutput, TerminationWatcher,
};
use crate::runtime::session::{ConsoleSession, SessionReport, DEFAULT_RATE};

#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Delay between a processed response and the next request.
    pub rate: Duration,
    pub input_fd: c_int,
    pub output_fd: c_int,
    /// Restore the terminal and exit on `SIGINT`/`SIGTERM`/`SIGHUP`/`SIGQUIT`.
    pub trap_termination: bool,
    /// Tee all console output into this file.
    pub write_log: Option<PathBuf>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            input_fd: libc::STDIN_FILENO,
            output_fd: libc::STDOUT_FILENO,
            trap_termination: true,
            write_log: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    RawMode(#[from] RawModeError),

    #[error("failed to start {what}: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: io::Error,
    },
}

impl RelayError {
    fn spawn(what: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Spawn { what, source }
    }
}

#[derive(Debug)]
pub struct RelayReport {
    pub session: SessionReport,
    /// Whether the terminal attributes were put back by this relay.
    pub terminal_restored: bool,
}

/// Run one console session on the local terminal.
///
/// Enters raw mode, starts the resize and keyboard threads, drives the poll
/// loop on `runtime` until it ends, then tears everything down and restores
/// the terminal. The only errors are failures to set the terminal up; once the
/// loop starts, every ending is reported in the [`RelayReport`].
pub fn run_relay<T: FeedTransport>(
    runtime: &Runtime,
    transport: T,
    info: &ConsoleSessionInfo,
    options: &RelayOptions,
) -> Result<RelayReport, RelayError> {
    let scope = RawModeScope::enter(options.input_fd)?;
    let termination = if options.trap_termination {
        Some(TerminationWatcher::spawn(scope.restorer())?)
    } else {
        None
    };

    let dimensions = TerminalDimensions::default();
    refresh_dimensions(options.output_fd, &dimensions);
    let resize = ResizeWatcher::spawn(options.output_fd, dimensions.clone())
        .map_err(RelayError::spawn("resize watcher"))?;

    let (key_tx, mut key_rx) = mpsc::unbounded_channel();
    let mut reader =
        InputReader::spawn(options.input_fd, key_tx).map_err(RelayError::spawn("input reader"))?;

    let mut output = TerminalOutput::new(options.output_fd);
    if let Some(path) = options.write_log.as_deref() {
        output = output.with_write_log(path);
    }

    let mut session = ConsoleSession::new(transport, info, dimensions, options.rate);
    let report = runtime.block_on(session.run(&mut key_rx, &mut output));

    reader.stop();
    drop(resize);
    drop(termination);

    let terminal_restored = match scope.restore() {
        Ok(restored) => restored,
        Err(err) => {
            warn!(%err, "failed to restore terminal mode");
            false
        }
    };
    info!(cycles = report.cycles, terminal_restored, "relay finished");

    Ok(RelayReport {
        session: report,
        terminal_restored,
    })
}
