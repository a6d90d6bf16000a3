use std::process::ExitCode;

use clap::Parser;
use remote_console::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match remote_console::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("\nerror: {err:#}");
            ExitCode::FAILURE
        }
    }
}
