//! The `remote_console` command: find a VPS, get a console token and relay
//! its console to the local terminal.

pub mod app;
pub mod cli;

pub use app::run;
pub use cli::Cli;
