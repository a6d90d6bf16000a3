//! Raw-mode lifecycle.
//!
//! [`RawModeScope`] saves the terminal attributes, switches to raw mode, and
//! puts them back exactly once no matter how the session ends: normal return,
//! early error, panic (via a process panic hook), or a termination signal (via
//! [`TerminationWatcher`]).
//!
//! The panic hook only restores scopes entered on the panicking thread. A
//! panic on a helper thread leaves the session, and raw mode, running.

use std::io;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, Once, TryLockError,
};
use std::thread::{self, JoinHandle, ThreadId};

use libc::{self, c_int};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RawModeError {
    #[error("file descriptor {0} is not a terminal")]
    NotATerminal(c_int),

    #[error("failed to read terminal attributes: {0}")]
    GetAttributes(#[source] io::Error),

    #[error("failed to switch terminal to raw mode: {0}")]
    SetAttributes(#[source] io::Error),

    #[error("failed to register termination signals: {0}")]
    Signals(#[source] io::Error),

    #[error("failed to start termination watcher: {0}")]
    Spawn(#[source] io::Error),
}

/// Signals that end the process from outside while the terminal is raw.
pub const TERMINATION_SIGNALS: [c_int; 4] =
    [libc::SIGINT, libc::SIGTERM, libc::SIGHUP, libc::SIGQUIT];

pub(crate) fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

pub(crate) fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

struct SavedMode {
    fd: c_int,
    original: libc::termios,
    restored: AtomicBool,
}

/// Shared handle that puts the saved terminal attributes back.
///
/// All clones share one "restored" flag: whichever path gets there first
/// restores, every later call is a no-op.
#[derive(Clone)]
pub struct TermiosRestorer {
    saved: Arc<SavedMode>,
}

impl TermiosRestorer {
    /// Returns `Ok(true)` if this call performed the restore.
    pub fn restore(&self) -> io::Result<bool> {
        if self.saved.restored.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        // Drop unread keystrokes so they do not leak into the shell.
        let _ = unsafe { libc::tcflush(self.saved.fd, libc::TCIFLUSH) };
        set_termios(self.saved.fd, &self.saved.original)?;
        Ok(true)
    }

    pub fn is_restored(&self) -> bool {
        self.saved.restored.load(Ordering::SeqCst)
    }
}

/// Raw terminal mode for the lifetime of the value.
pub struct RawModeScope {
    restorer: TermiosRestorer,
    panic_registration: u64,
}

impl RawModeScope {
    /// Save the current mode of `fd` and switch it to raw: no echo, no line
    /// buffering, no signal generation, no output post-processing.
    pub fn enter(fd: c_int) -> Result<Self, RawModeError> {
        if unsafe { libc::isatty(fd) } != 1 {
            return Err(RawModeError::NotATerminal(fd));
        }

        let original = get_termios(fd).map_err(RawModeError::GetAttributes)?;
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        set_termios(fd, &raw).map_err(RawModeError::SetAttributes)?;

        let restorer = TermiosRestorer {
            saved: Arc::new(SavedMode {
                fd,
                original,
                restored: AtomicBool::new(false),
            }),
        };
        let panic_registration = register_panic_restore(restorer.clone());
        debug!(fd, "entered raw mode");

        Ok(Self {
            restorer,
            panic_registration,
        })
    }

    pub fn restorer(&self) -> TermiosRestorer {
        self.restorer.clone()
    }

    /// Restore now and report failures. Dropping the scope afterwards is a no-op.
    pub fn restore(&self) -> io::Result<bool> {
        let restored = self.restorer.restore()?;
        if restored {
            debug!("terminal mode restored");
        }
        Ok(restored)
    }

    pub fn is_restored(&self) -> bool {
        self.restorer.is_restored()
    }
}

impl Drop for RawModeScope {
    fn drop(&mut self) {
        unregister_panic_restore(self.panic_registration);
        if let Err(err) = self.restore() {
            warn!(%err, "failed to restore terminal mode");
        }
    }
}

struct PanicEntry {
    id: u64,
    owner: ThreadId,
    restorer: TermiosRestorer,
}

static PANIC_RESTORERS: Mutex<Vec<PanicEntry>> = Mutex::new(Vec::new());
static NEXT_REGISTRATION: AtomicU64 = AtomicU64::new(1);
static PANIC_HOOK: Once = Once::new();

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn register_panic_restore(restorer: TermiosRestorer) -> u64 {
    // Installed once per process; it only ever touches scopes that are still registered.
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_all_for_panic();
            previous(info);
        }));
    });

    let id = NEXT_REGISTRATION.fetch_add(1, Ordering::Relaxed);
    lock_unpoisoned(&PANIC_RESTORERS).push(PanicEntry {
        id,
        owner: thread::current().id(),
        restorer,
    });
    id
}

fn unregister_panic_restore(id: u64) {
    lock_unpoisoned(&PANIC_RESTORERS).retain(|entry| entry.id != id);
}

fn restore_all_for_panic() {
    // Never block inside the panic hook: a panic while the registry is locked
    // must not deadlock.
    let restorers = match PANIC_RESTORERS.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        Err(TryLockError::WouldBlock) => return,
    };
    let current = thread::current().id();
    for entry in restorers.iter().filter(|entry| entry.owner == current) {
        let _ = entry.restorer.restore();
    }
}

/// Restores the terminal and exits when the process is asked to terminate.
///
/// Raw mode disables keyboard-generated signals, but any of
/// [`TERMINATION_SIGNALS`] sent from outside would otherwise kill the process
/// with the terminal left raw.
pub struct TerminationWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl TerminationWatcher {
    pub fn spawn(restorer: TermiosRestorer) -> Result<Self, RawModeError> {
        let mut signals = Signals::new(TERMINATION_SIGNALS).map_err(RawModeError::Signals)?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("console-termination".to_string())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    warn!(signal, "terminating on signal");
                    let _ = restorer.restore();
                    std::process::exit(128 + signal);
                }
            })
            .map_err(RawModeError::Spawn)?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for TerminationWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
