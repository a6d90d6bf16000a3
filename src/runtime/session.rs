//! The console poll loop.
//!
//! One task alternates between a single in-flight feed request and an idle
//! timer. Keystrokes are absorbed the moment they arrive in either phase; the
//! next request picks up whatever accumulated since the previous snapshot.

use std::io::Write;
use std::time::Duration;

use console_api::{ConsoleApiError, ConsoleSessionInfo, FeedRequest, FeedResponse, FeedTransport};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, trace, warn};

use crate::core::dimensions::TerminalDimensions;
use crate::core::input::{InputBuffer, KeyOutcome};

/// Default delay between a processed response and the next request.
pub const DEFAULT_RATE: Duration = Duration::from_millis(50);

pub const CLOSED_NOTICE: &str = "\r\nSession closed.\r\n";
pub const TRANSPORT_FAILURE_NOTICE: &str = "\r\nError: connection to console router failed\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next tick.
    Idle,
    /// A feed request is in flight.
    Polling,
    Terminated,
}

#[derive(Debug)]
pub enum SessionOutcome {
    /// The user typed the local escape sequence.
    LocalEscape,
    /// The console router reported the session as ended.
    Closed { message: String },
    /// A feed request failed; the session cannot continue.
    Failed(ConsoleApiError),
}

#[derive(Debug)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Fully processed request/response cycles.
    pub cycles: u64,
}

enum Wake {
    Response(Result<FeedResponse, ConsoleApiError>),
    LocalEscape,
}

pub struct ConsoleSession<T> {
    transport: T,
    token: String,
    rate: Duration,
    dimensions: TerminalDimensions,
    input: InputBuffer,
    state: LoopState,
    cycles: u64,
}

impl<T: FeedTransport> ConsoleSession<T> {
    pub fn new(
        transport: T,
        info: &ConsoleSessionInfo,
        dimensions: TerminalDimensions,
        rate: Duration,
    ) -> Self {
        Self {
            transport,
            token: info.token.clone(),
            rate,
            dimensions,
            input: InputBuffer::new(),
            state: LoopState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Keystrokes captured but not yet sent.
    pub fn pending_input(&self) -> &[u8] {
        self.input.pending()
    }

    /// Drive the loop until the session ends.
    ///
    /// `keys` delivers raw keyboard chunks; a closed channel only stops input,
    /// polling continues. Output is written to `display` best-effort. No error
    /// escapes: every ending is reported through [`SessionOutcome`].
    pub async fn run<W: Write>(
        &mut self,
        keys: &mut UnboundedReceiver<Vec<u8>>,
        display: &mut W,
    ) -> SessionReport {
        let mut keys_open = true;
        info!(rate = ?self.rate, "console session started");

        loop {
            self.state = LoopState::Polling;
            let request = self.snapshot();

            let wake = {
                let pending = self.transport.feed(request);
                tokio::pin!(pending);
                loop {
                    tokio::select! {
                        biased;
                        chunk = keys.recv(), if keys_open => {
                            if absorb(&mut self.input, chunk, &mut keys_open) == KeyOutcome::LocalTerminate {
                                break Wake::LocalEscape;
                            }
                        }
                        response = &mut pending => break Wake::Response(response),
                    }
                }
            };

            let response = match wake {
                Wake::LocalEscape => return self.finish(SessionOutcome::LocalEscape),
                Wake::Response(response) => response,
            };
            self.cycles += 1;

            match response {
                Ok(FeedResponse::Output(bytes)) => {
                    trace!(cycle = self.cycles, bytes = bytes.len(), "console output");
                    show(display, &bytes);
                }
                Ok(FeedResponse::Closed(message)) => {
                    show(display, message.as_bytes());
                    show(display, CLOSED_NOTICE.as_bytes());
                    return self.finish(SessionOutcome::Closed { message });
                }
                Err(err) => {
                    error!(cycle = self.cycles, %err, "console feed failed");
                    show(display, TRANSPORT_FAILURE_NOTICE.as_bytes());
                    return self.finish(SessionOutcome::Failed(err));
                }
            }

            self.state = LoopState::Idle;
            let escaped = {
                let tick = tokio::time::sleep(self.rate);
                tokio::pin!(tick);
                loop {
                    tokio::select! {
                        biased;
                        chunk = keys.recv(), if keys_open => {
                            if absorb(&mut self.input, chunk, &mut keys_open) == KeyOutcome::LocalTerminate {
                                break true;
                            }
                        }
                        () = &mut tick => break false,
                    }
                }
            };
            if escaped {
                return self.finish(SessionOutcome::LocalEscape);
            }
        }
    }

    /// Take the buffered keys and current size for the next request. The
    /// buffer is empty afterwards.
    fn snapshot(&mut self) -> FeedRequest {
        let dimensions = self.dimensions.current();
        let keys = self.input.take();
        trace!(
            keys = keys.len(),
            width = dimensions.width,
            height = dimensions.height,
            "feed snapshot"
        );
        FeedRequest::new(self.token.clone(), keys, dimensions.width, dimensions.height)
    }

    fn finish(&mut self, outcome: SessionOutcome) -> SessionReport {
        self.state = LoopState::Terminated;
        info!(cycles = self.cycles, ?outcome, "console session ended");
        SessionReport {
            outcome,
            cycles: self.cycles,
        }
    }
}

fn absorb(input: &mut InputBuffer, chunk: Option<Vec<u8>>, keys_open: &mut bool) -> KeyOutcome {
    match chunk {
        Some(bytes) => input.push(&bytes),
        None => {
            debug!("keyboard input closed; continuing without input");
            *keys_open = false;
            KeyOutcome::Continue
        }
    }
}

fn show<W: Write>(display: &mut W, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    if let Err(err) = display.write_all(bytes).and_then(|()| display.flush()) {
        warn!(%err, "failed to write console output");
    }
}
