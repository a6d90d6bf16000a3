#![cfg(unix)]

use std::net::TcpListener;
use std::time::{Duration, Instant};

use console_api::{ConsoleApiConfig, ConsoleFeedClient, ConsoleSessionInfo};
use libc::c_int;
use time::macros::datetime;
use vps_console::{run_relay, RelayOptions, SessionOutcome, TRANSPORT_FAILURE_NOTICE};

struct Pty {
    master: c_int,
    slave: c_int,
}

impl Drop for Pty {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.master);
            libc::close(self.slave);
        }
    }
}

fn open_pty() -> Pty {
    let mut master = -1;
    let mut slave = -1;
    let rc = unsafe {
        libc::openpty(
            &mut master,
            &mut slave,
            std::ptr::null_mut(),
            std::ptr::null(),
            std::ptr::null(),
        )
    };
    assert_eq!(rc, 0, "openpty failed: {}", std::io::Error::last_os_error());
    Pty { master, slave }
}

fn termios(fd: c_int) -> libc::termios {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    assert_eq!(unsafe { libc::tcgetattr(fd, &mut termios) }, 0);
    termios
}

fn drain(fd: c_int, timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    while Instant::now() < deadline {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        if unsafe { libc::poll(&mut pfd, 1, 20) } <= 0 {
            if !out.is_empty() {
                break;
            }
            continue;
        }
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }
        out.extend_from_slice(&buf[..n as usize]);
    }
    out
}

fn refused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[test]
fn unreachable_router_reports_failure_and_restores_terminal() {
    let pty = open_pty();
    let before = termios(pty.slave);

    let endpoint = refused_endpoint();
    let info = ConsoleSessionInfo::new("tok", datetime!(2026-10-16 09:00 UTC), endpoint, 101);
    let client = ConsoleFeedClient::new(
        ConsoleApiConfig::new(info.endpoint.clone(), info.target_id)
            .with_timeout(Duration::from_secs(5)),
    )
    .expect("client");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let options = RelayOptions {
        input_fd: pty.slave,
        output_fd: pty.slave,
        trap_termination: false,
        ..RelayOptions::default()
    };

    let report = run_relay(&runtime, client, &info, &options).expect("relay");

    assert!(matches!(report.session.outcome, SessionOutcome::Failed(_)));
    assert_eq!(report.session.cycles, 1);
    assert!(report.terminal_restored);

    let after = termios(pty.slave);
    assert_eq!(before.c_lflag, after.c_lflag);
    assert_eq!(before.c_iflag, after.c_iflag);
    assert_eq!(before.c_oflag, after.c_oflag);
    assert_eq!(before.c_cflag, after.c_cflag);

    let shown = drain(pty.master, Duration::from_secs(2));
    assert_eq!(shown, TRANSPORT_FAILURE_NOTICE.as_bytes());
}

#[test]
fn relay_refuses_a_non_terminal() {
    let info = ConsoleSessionInfo::new(
        "tok",
        datetime!(2026-10-16 09:00 UTC),
        "http://127.0.0.1:9",
        101,
    );
    let client =
        ConsoleFeedClient::new(ConsoleApiConfig::new(info.endpoint.clone(), 101)).expect("client");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let mut fds = [0; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    let options = RelayOptions {
        input_fd: fds[0],
        output_fd: fds[1],
        trap_termination: false,
        ..RelayOptions::default()
    };

    let err = run_relay(&runtime, client, &info, &options).expect_err("pipe is not a tty");
    assert!(matches!(err, vps_console::RelayError::RawMode(_)));

    unsafe {
        libc::close(fds[0]);
        libc::close(fds[1]);
    }
}
