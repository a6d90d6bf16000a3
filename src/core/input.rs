//! Keystroke buffering and local escape detection.
//!
//! Every byte read from the local terminal passes through [`InputBuffer::push`].
//! Bytes are buffered in arrival order until the poll loop takes a snapshot;
//! the two-byte local escape (`ESC` `.`) ends the session without ever being
//! buffered.

/// First byte of the local escape sequence.
pub const ESCAPE_LEAD: u8 = 0x1b;
/// Second byte of the local escape sequence.
pub const ESCAPE_FINAL: u8 = b'.';

/// Progress through the local escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeState {
    #[default]
    Idle,
    /// An `ESC` was seen and is held back until the next byte decides its fate.
    Armed,
}

/// Result of feeding bytes into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    /// The local escape sequence completed; nothing after it was consumed.
    LocalTerminate,
}

#[derive(Debug, Default)]
pub struct InputBuffer {
    pending: Vec<u8>,
    state: EscapeState,
    terminated: bool,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EscapeState {
        self.state
    }

    /// Bytes waiting for the next poll cycle.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Feed a chunk of raw terminal input.
    ///
    /// Once the escape sequence has fired, further input is ignored and
    /// `LocalTerminate` is reported again.
    pub fn push(&mut self, bytes: &[u8]) -> KeyOutcome {
        for &byte in bytes {
            if self.push_byte(byte) == KeyOutcome::LocalTerminate {
                return KeyOutcome::LocalTerminate;
            }
        }
        KeyOutcome::Continue
    }

    pub fn push_byte(&mut self, byte: u8) -> KeyOutcome {
        if self.terminated {
            return KeyOutcome::LocalTerminate;
        }

        match (self.state, byte) {
            (EscapeState::Idle, ESCAPE_LEAD) => {
                self.state = EscapeState::Armed;
            }
            (EscapeState::Idle, _) => self.pending.push(byte),
            (EscapeState::Armed, ESCAPE_FINAL) => {
                self.state = EscapeState::Idle;
                self.terminated = true;
                return KeyOutcome::LocalTerminate;
            }
            // A second ESC releases the held one and re-arms.
            (EscapeState::Armed, ESCAPE_LEAD) => self.pending.push(ESCAPE_LEAD),
            (EscapeState::Armed, _) => {
                self.pending.push(ESCAPE_LEAD);
                self.pending.push(byte);
                self.state = EscapeState::Idle;
            }
        }
        KeyOutcome::Continue
    }

    /// Move all buffered bytes out, leaving the buffer empty.
    ///
    /// A held-back `ESC` is not part of the snapshot: it stays armed so that an
    /// escape split across two cycles is still recognised.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }
}
