//! Descriptor-level terminal plumbing: full writes, size queries, and the
//! background threads that feed the poll loop.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};

use libc::{self, c_int};
use signal_hook::iterator::{Handle, Signals};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use crate::core::dimensions::{Dimensions, TerminalDimensions};

/// How long the input thread blocks in `poll` before re-checking its stop flag.
const INPUT_POLL_MS: i32 = 50;
const READ_CHUNK: usize = 4096;

fn wait_writable(fd: c_int) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }

        return Err(io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

pub(crate) fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> io::Result<usize>,
    FWait: FnMut(c_int) -> io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
            }
            Ok(count) => {
                let remaining = bytes.len() - written;
                if count > remaining {
                    return Err(io::Error::other(
                        "write returned more bytes than requested",
                    ));
                }
                written += count;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn write_once(fd: c_int, buf: &[u8]) -> io::Result<usize> {
    let result = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(result as usize)
    }
}

/// Query the kernel for the window size of `fd`.
pub fn read_winsize(fd: c_int) -> Option<Dimensions> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 {
        Dimensions::new(size.ws_col, size.ws_row)
    } else {
        None
    }
}

/// Re-query the window size and publish it. Failed or zero-sized queries keep
/// the previous value.
pub fn refresh_dimensions(fd: c_int, dimensions: &TerminalDimensions) -> Option<Dimensions> {
    let current = read_winsize(fd)?;
    dimensions.update(current);
    debug!(width = current.width, height = current.height, "terminal size");
    Some(current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Readable,
    Idle,
    Closed,
}

pub(crate) fn poll_readable(fd: c_int, timeout_ms: i32) -> Readiness {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    if result < 0 {
        let err = io::Error::last_os_error();
        return if err.kind() == io::ErrorKind::Interrupted {
            Readiness::Idle
        } else {
            Readiness::Closed
        };
    }
    if result == 0 {
        return Readiness::Idle;
    }
    if (fds.revents & libc::POLLIN) != 0 {
        Readiness::Readable
    } else if (fds.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL)) != 0 {
        Readiness::Closed
    } else {
        Readiness::Idle
    }
}

/// Local display sink: full, EINTR/EAGAIN-safe writes to a descriptor.
///
/// Optionally tees everything written into a log file; the first failure to
/// write the tee disables it for the rest of the session.
pub struct TerminalOutput {
    fd: c_int,
    write_log: Option<File>,
}

impl TerminalOutput {
    pub fn new(fd: c_int) -> Self {
        Self {
            fd,
            write_log: None,
        }
    }

    pub fn with_write_log(mut self, path: &Path) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => self.write_log = Some(file),
            Err(err) => warn!(path = %path.display(), %err, "cannot open output write log"),
        }
        self
    }
}

impl Write for TerminalOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write_all_fd_with(self.fd, buf, write_once, wait_writable)?;
        if let Some(file) = self.write_log.as_mut() {
            if let Err(err) = file.write_all(buf) {
                warn!(%err, "output write log failed; disabling");
                self.write_log = None;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Background reader forwarding raw keyboard chunks to the poll loop.
///
/// The thread ends on EOF, on a read error, when the receiving side is gone,
/// or when [`InputReader::stop`] is called. Dropping the sender is how the
/// loop learns the keyboard went away.
pub struct InputReader {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl InputReader {
    pub fn spawn(fd: c_int, sender: UnboundedSender<Vec<u8>>) -> io::Result<Self> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread = thread::Builder::new()
            .name("console-input".to_string())
            .spawn({
                let stop_flag = Arc::clone(&stop_flag);
                move || read_loop(fd, &sender, &stop_flag)
            })?;

        Ok(Self {
            stop_flag,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop(fd: c_int, sender: &UnboundedSender<Vec<u8>>, stop_flag: &AtomicBool) {
    let mut buffer = [0u8; READ_CHUNK];

    while !stop_flag.load(Ordering::SeqCst) {
        match poll_readable(fd, INPUT_POLL_MS) {
            Readiness::Idle => continue,
            Readiness::Closed => break,
            Readiness::Readable => {}
        }

        let read_len = unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
        if read_len < 0 {
            let err = io::Error::last_os_error();
            if matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ) {
                continue;
            }
            warn!(%err, "keyboard read failed");
            break;
        }
        if read_len == 0 {
            break;
        }

        trace!(bytes = read_len, "keyboard input");
        if sender.send(buffer[..read_len as usize].to_vec()).is_err() {
            break;
        }
    }

    debug!("input reader stopped");
}

/// Owns the `SIGWINCH` registration on a dedicated thread, so resize handling
/// never touches the signal disposition of the thread running the loop.
pub struct ResizeWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl ResizeWatcher {
    pub fn spawn(fd: c_int, dimensions: TerminalDimensions) -> io::Result<Self> {
        let mut signals = Signals::new([libc::SIGWINCH])?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("console-resize".to_string())
            .spawn(move || {
                for _ in signals.forever() {
                    refresh_dimensions(fd, &dimensions);
                }
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
