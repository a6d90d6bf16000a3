//! Platform-independent session state.

pub mod dimensions;
pub mod input;
