//! Unix terminal integrations.

pub mod process_terminal;
pub mod raw_mode;

pub use process_terminal::{
    read_winsize, refresh_dimensions, InputReader, ResizeWatcher, TerminalOutput,
};
pub use raw_mode::{RawModeError, RawModeScope, TerminationWatcher, TermiosRestorer};
