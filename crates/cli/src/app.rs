// Process flow shared by main and its tests: flag outcome and relay run

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;

use crate::args::Args;
use sqspipe_core::application::{RelayConfig, RelayController, RelaySummary, StartOutcome};
use sqspipe_core::AppError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Flag handling ended the process before any queue was touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarlyExit {
    pub code: i32,
    /// Text for stdout (help, version, or error plus usage)
    pub output: String,
}

/// Parse and validate the command line.
///
/// `--help`/`--version` exit 0; every other flag problem exits 1 with the
/// message and usage on stdout.
pub fn parse_args<I, T>(argv: I) -> Result<(Args, RelayConfig), EarlyExit>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::try_parse_from(argv).map_err(|e| {
        let code = match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
            _ => EXIT_FAILURE,
        };
        EarlyExit {
            code,
            output: e.render().to_string(),
        }
    })?;

    let config = args.relay_config().map_err(|message| EarlyExit {
        code: EXIT_FAILURE,
        output: format!("error: {message}\n\n{}\n", Args::command().render_usage()),
    })?;
    Ok((args, config))
}

/// Run the relay until it stops; `None` when the source was empty
pub async fn run_relay(relay: &mut RelayController) -> Result<Option<RelaySummary>, AppError> {
    match relay.start().await? {
        StartOutcome::Empty => Ok(None),
        StartOutcome::Started => Ok(Some(relay.wait().await)),
    }
}
