#![forbid(unsafe_code)]

//! Shared plumbing for `br_metadata` and `br_mapper`.

pub mod args;
pub mod logging;
pub mod timing;

pub use args::CommonArgs;

use br_engine::BatchReport;
use clap::Parser;
use clap::error::ErrorKind;
use std::process::ExitCode;
use timing::RunClock;
use tracing::error;

/// Parses the command line. Help and version exit 0; any other parse error exits 1.
pub fn parse<C: Parser>() -> Result<C, ExitCode> {
    C::try_parse().map_err(|err| {
        let _ = err.print();
        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
            _ => ExitCode::from(1),
        }
    })
}

/// Runs `body` between the timing report lines and maps its result to an exit code.
pub fn run(tool: &str, body: impl FnOnce() -> anyhow::Result<BatchReport>) -> ExitCode {
    let clock = RunClock::start();
    let outcome = body();
    clock.finish();
    match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(tool, error = %format!("{err:#}"), "run aborted");
            ExitCode::from(1)
        }
    }
}
