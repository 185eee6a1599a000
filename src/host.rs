/*!
Transport front-end: mode selection and the one-request lifecycle.

Modes, checked in this order:
  1. version   - `--version` prints `VERSION` and stops, nothing else runs
  2. direct    - `--command` given; params from flags, plain text output,
                 standard input is never read
  3. stdio     - one envelope in, one envelope out

Unknown commands in stdio mode are echoed back byte for byte. Transport
failures (envelope read/write, request decode, response encode) surface as
`HostError`; everything a command does is reported inside its response.
*/

use std::io::{self, Read, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::cmd::{Capabilities, Command, Request, dispatch, params_from_cli};
use crate::messaging::{FrameError, read_message, write_message};
use crate::utils::{LogContext, LogLevel, Rotation};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: flex-confirm-mail-host --command <fetch|choose-file|outlook-gpo-configs> \
                     [--params <JSON>] [--params-file <PATH>] [--debug]";

/// Process configuration, already parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub report_version: bool,
    pub command: Option<String>,
    pub params: Option<String>,
    pub params_file: Option<PathBuf>,
    pub debug: bool,
    /// Directory for rotating log files (stdio mode with `logging`).
    pub log_dir: PathBuf,
}

/// Streams the front-end talks through. Stdout carries protocol bytes or
/// direct-mode results only.
pub struct Streams<'a> {
    pub input: &'a mut dyn Read,
    pub output: &'a mut dyn Write,
    pub error_out: &'a mut dyn Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Direct mode: the command ran and reported an error.
    OperationFailed,
    /// Direct mode: bad command name or parameters; nothing was run.
    UsageError,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::OperationFailed => 1,
            Outcome::UsageError => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("invalid request: {0}")]
    Param(#[source] serde_json::Error),
    #[error("failed to serialize response: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

pub fn run(
    options: &HostOptions,
    streams: &mut Streams<'_>,
    caps: &Capabilities<'_>,
) -> Result<Outcome, HostError> {
    if options.report_version {
        writeln!(streams.output, "{VERSION}").map_err(HostError::Output)?;
        streams.output.flush().map_err(HostError::Output)?;
        return Ok(Outcome::Success);
    }
    match &options.command {
        Some(name) => run_direct(name, options, streams, caps),
        None => run_stdio(options, streams, caps),
    }
}

/* ---- Direct invocation ---- */

fn usage(streams: &mut Streams<'_>, problem: &str) -> Result<Outcome, HostError> {
    writeln!(streams.error_out, "{problem}").map_err(HostError::Output)?;
    writeln!(streams.error_out, "{USAGE}").map_err(HostError::Output)?;
    Ok(Outcome::UsageError)
}

fn run_direct(
    name: &str,
    options: &HostOptions,
    streams: &mut Streams<'_>,
    caps: &Capabilities<'_>,
) -> Result<Outcome, HostError> {
    let log = if options.debug {
        LogContext::stderr(Some(LogLevel::Debug))
    } else {
        LogContext::silent()
    };

    let Some(command) = Command::from_name(name) else {
        return usage(streams, &format!("unknown command: {name}"));
    };
    let params = match params_from_cli(options.params.as_deref(), options.params_file.as_deref()) {
        Ok(params) => params,
        Err(err) => return usage(streams, &format!("invalid parameters: {err:#}")),
    };
    let params = match params {
        Some(params) => params,
        None if command.requires_params() => {
            return usage(streams, &format!("{command} requires --params or --params-file"));
        }
        None => Default::default(),
    };
    if command == Command::Fetch && params.path.is_empty() {
        return usage(streams, "fetch requires a \"path\" parameter");
    }

    log.info(format!("Command:{command}"));
    let response = dispatch(command, &params, caps, &log);
    let text = response.to_text().map_err(HostError::Serialization)?;

    let outcome = if response.error().is_empty() {
        writeln!(streams.output, "{text}").map_err(HostError::Output)?;
        Outcome::Success
    } else {
        if !text.is_empty() {
            writeln!(streams.output, "{text}").map_err(HostError::Output)?;
        }
        writeln!(streams.error_out, "{}", response.error()).map_err(HostError::Output)?;
        Outcome::OperationFailed
    };
    streams.output.flush().map_err(HostError::Output)?;
    Ok(outcome)
}

/* ---- Stdio protocol ---- */

fn request_log(request: &Request, options: &HostOptions) -> LogContext {
    match LogLevel::from_flags(request.logging, request.debug) {
        Some(level) => {
            let rotation = Rotation::new(
                options.log_dir.clone(),
                request.log_rotation_time,
                request.log_rotation_count,
            );
            LogContext::rotating(level, &rotation)
        }
        None => LogContext::silent(),
    }
}

fn run_stdio(
    options: &HostOptions,
    streams: &mut Streams<'_>,
    caps: &Capabilities<'_>,
) -> Result<Outcome, HostError> {
    let body = read_message(&mut *streams.input)?;
    let request: Request = serde_json::from_slice(&body).map_err(HostError::Param)?;

    let log = request_log(&request, options);
    log.info(format!("Command:{}", request.command));
    log.debug(format!("logRotationCount:{}", request.log_rotation_count));
    log.debug(format!("logRotationTime:{}", request.log_rotation_time));

    let result = respond(&request, &body, &mut *streams.output, caps, &log);
    if let Err(err) = &result {
        log.error(err.to_string());
    }
    result.map(|()| Outcome::Success)
}

fn respond(
    request: &Request,
    body: &[u8],
    output: &mut dyn Write,
    caps: &Capabilities<'_>,
    log: &LogContext,
) -> Result<(), HostError> {
    match Command::from_name(&request.command) {
        Some(command) => {
            let response = dispatch(command, &request.params, caps, log);
            let payload = response.to_json().map_err(HostError::Serialization)?;
            write_message(output, &payload)?;
        }
        None => {
            log.debug(format!("unknown command {:?}, echoing request", request.command));
            write_message(output, body)?;
        }
    }
    Ok(())
}
