use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use console_api::{parse_expiration, ConsoleFeedClient, ConsoleSessionInfo};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tokio::runtime::Builder;
use tracing::{info, warn};
use vps_api::{VpsApiClient, VpsLocation};
use vps_console::{logging, run_relay, EnvConfig, RelayOptions, SessionOutcome};

use crate::cli::{Cli, Preissued};

pub const MISSING_VPS_ID: &str = "provide VPS ID as an argument";

/// Local offset, read before any thread is started.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn format_expiration(expiration: OffsetDateTime, offset: UtcOffset) -> String {
    let local = expiration.to_offset(offset);
    local
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
        ))
        .unwrap_or_else(|_| local.to_string())
}

fn progress<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()
}

pub fn print_location<W: Write>(out: &mut W, location: &VpsLocation) -> io::Result<()> {
    writeln!(
        out,
        "  VPS is on {}, located in {}.",
        location.node_domain, location.location_label
    )?;
    writeln!(out, "Console router URL is {}", location.console_server)
}

pub fn print_expiration<W: Write>(
    out: &mut W,
    expiration: OffsetDateTime,
    offset: UtcOffset,
) -> io::Result<()> {
    writeln!(out, "  token expires at {}", format_expiration(expiration, offset))
}

pub fn print_banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Connecting to remote console...")?;
    writeln!(out, "Press ESC . to exit")?;
    writeln!(out)?;
    out.flush()
}

/// Look the VPS up and issue a console token for it, reporting progress.
pub async fn discover_session<W: Write>(
    api: &VpsApiClient,
    vps_id: u64,
    offset: UtcOffset,
    out: &mut W,
) -> Result<ConsoleSessionInfo> {
    progress(out, "Locating VPS..")?;
    let location = api.locate(vps_id).await.context("failed to locate VPS")?;
    print_location(out, &location)?;

    progress(out, "Obtaining authentication token...")?;
    let token = api
        .issue_console_token(vps_id)
        .await
        .context("failed to obtain console token")?;
    print_expiration(out, token.expiration, offset)?;

    Ok(ConsoleSessionInfo::new(
        token.token,
        token.expiration,
        location.console_server,
        vps_id,
    ))
}

pub fn preissued_session<W: Write>(
    preissued: &Preissued,
    vps_id: u64,
    offset: UtcOffset,
    out: &mut W,
) -> Result<ConsoleSessionInfo> {
    let expiration = parse_expiration(&preissued.expiration)?;
    writeln!(out, "Console router URL is {}", preissued.endpoint)?;
    print_expiration(out, expiration, offset)?;
    Ok(ConsoleSessionInfo::new(
        preissued.token.clone(),
        expiration,
        preissued.endpoint.clone(),
        vps_id,
    ))
}

/// Process exit status for a finished session.
pub fn exit_status(outcome: &SessionOutcome) -> u8 {
    match outcome {
        SessionOutcome::LocalEscape | SessionOutcome::Closed { .. } => 0,
        SessionOutcome::Failed(_) => 1,
    }
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let offset = local_offset();
    let env = EnvConfig::from_env();
    if let Err(err) = logging::init(&env) {
        eprintln!("warning: logging disabled: {err}");
    }

    let Some(vps_id) = cli.vps_id else {
        println!("{MISSING_VPS_ID}");
        return Ok(ExitCode::FAILURE);
    };

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let info = {
        let mut out = io::stdout().lock();
        let info = match cli.preissued() {
            Some(preissued) => preissued_session(&preissued, vps_id, offset, &mut out)?,
            None => {
                let api = VpsApiClient::new(cli.api_config())?;
                runtime.block_on(discover_session(&api, vps_id, offset, &mut out))?
            }
        };
        if info.is_expired_at(OffsetDateTime::now_utc()) {
            warn!(expiration = %info.expiration, "console token already expired");
        }
        print_banner(&mut out)?;
        info
    };

    let client = ConsoleFeedClient::new(cli.console_config(&info.endpoint, vps_id))?;
    let options = RelayOptions {
        rate: cli.refresh_rate(),
        write_log: env.write_log.clone(),
        ..RelayOptions::default()
    };
    info!(vps_id, endpoint = %info.endpoint, "opening remote console");
    let report =
        run_relay(&runtime, client, &info, &options).context("failed to prepare local terminal")?;
    println!();

    Ok(ExitCode::from(exit_status(&report.session.outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_api::ConsoleApiError;
    use pretty_assertions::assert_eq;
    use time::macros::{datetime, offset};

    fn location() -> VpsLocation {
        VpsLocation {
            vps_id: 101,
            node_domain: "node1.prg.vpsfree.cz".to_string(),
            location_label: "Praha".to_string(),
            console_server: "https://console.vpsfree.cz".to_string(),
        }
    }

    #[test]
    fn expiration_is_shown_in_local_time() {
        let expiration = datetime!(2026-10-16 08:00 UTC);
        assert_eq!(
            format_expiration(expiration, offset!(+2)),
            "2026-10-16 10:00:00 +0200"
        );
        assert_eq!(
            format_expiration(expiration, UtcOffset::UTC),
            "2026-10-16 08:00:00 +0000"
        );
    }

    #[test]
    fn metadata_lines() {
        let mut out = Vec::new();
        progress(&mut out, "Locating VPS..").expect("write");
        print_location(&mut out, &location()).expect("write");
        progress(&mut out, "Obtaining authentication token...").expect("write");
        print_expiration(&mut out, datetime!(2026-10-16 08:00 UTC), offset!(+2)).expect("write");
        print_banner(&mut out).expect("write");

        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Locating VPS..  VPS is on node1.prg.vpsfree.cz, located in Praha.\n\
             Console router URL is https://console.vpsfree.cz\n\
             Obtaining authentication token...  token expires at 2026-10-16 10:00:00 +0200\n\
             Connecting to remote console...\n\
             Press ESC . to exit\n\
             \n"
        );
    }

    #[test]
    fn preissued_session_skips_lookup() {
        let preissued = Preissued {
            endpoint: "https://console.example".to_string(),
            token: "abc".to_string(),
            expiration: "2026-10-16T08:00:00Z".to_string(),
        };
        let mut out = Vec::new();
        let info = preissued_session(&preissued, 7, UtcOffset::UTC, &mut out).expect("session");

        assert_eq!(info.token, "abc");
        assert_eq!(info.endpoint, "https://console.example");
        assert_eq!(info.target_id, 7);
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Console router URL is https://console.example\n  token expires at 2026-10-16 08:00:00 +0000\n"
        );
    }

    #[test]
    fn preissued_session_rejects_bad_expiration() {
        let preissued = Preissued {
            endpoint: "https://console.example".to_string(),
            token: "abc".to_string(),
            expiration: "later".to_string(),
        };
        assert!(preissued_session(&preissued, 7, UtcOffset::UTC, &mut Vec::new()).is_err());
    }

    #[test]
    fn only_failures_exit_non_zero() {
        assert_eq!(exit_status(&SessionOutcome::LocalEscape), 0);
        assert_eq!(
            exit_status(&SessionOutcome::Closed {
                message: String::new()
            }),
            0
        );
        assert_eq!(
            exit_status(&SessionOutcome::Failed(ConsoleApiError::InvalidPayload(
                "bad".to_string()
            ))),
            1
        );
    }
}
