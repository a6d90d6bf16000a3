//! Session orchestration.

pub mod relay;
pub mod session;

pub use relay::{run_relay, RelayError, RelayOptions, RelayReport};
pub use session::{
    ConsoleSession, LoopState, SessionOutcome, SessionReport, CLOSED_NOTICE, DEFAULT_RATE,
    TRANSPORT_FAILURE_NOTICE,
};
