//! Remote VPS console relay.
//!
//! The console router is only reachable through HTTP request/response cycles.
//! [`ConsoleSession`] turns that into an interactive terminal: it ships
//! buffered keystrokes and the terminal size on every poll and writes the
//! returned output verbatim.
//!
//! # Public API Overview
//! - [`InputBuffer`] buffers raw keystrokes and detects the local escape (`ESC` `.`).
//! - [`TerminalDimensions`] is the shared, resize-updated terminal size.
//! - [`RawModeScope`] puts the local terminal in raw mode and always restores it.
//! - [`run_relay`] wires the above around a [`ConsoleSession`] on the process terminal.

pub mod config;
pub mod logging;

pub mod core;
#[cfg(unix)]
pub mod platform;
#[cfg(unix)]
pub mod runtime;

pub use crate::core::dimensions;
pub use crate::core::input;

/// Keystroke buffering and escape detection.
pub use crate::core::input::{EscapeState, InputBuffer, KeyOutcome, ESCAPE_FINAL, ESCAPE_LEAD};
/// Terminal size tracking.
pub use crate::core::dimensions::{Dimensions, TerminalDimensions};

pub use crate::config::EnvConfig;

#[cfg(unix)]
pub use crate::platform::raw_mode;
#[cfg(unix)]
pub use crate::platform::{RawModeError, RawModeScope, TerminationWatcher, TermiosRestorer};
#[cfg(unix)]
pub use crate::runtime::{
    run_relay, ConsoleSession, LoopState, RelayError, RelayOptions, RelayReport, SessionOutcome,
    SessionReport, CLOSED_NOTICE, DEFAULT_RATE, TRANSPORT_FAILURE_NOTICE,
};
