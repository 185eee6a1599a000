use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod cmd;
mod host;
mod messaging;
mod path;
mod platform;
mod utils;

use cmd::Capabilities;
use host::{HostOptions, Outcome, Streams};
use path::{ProcessEnv, SysinfoLocator};
use platform::{NativeFileChooser, NativePolicyStore};

/// FlexConfirmMail native messaging host.
///
/// Launched by the browser with no flags: reads one length-prefixed JSON
/// request from stdin and writes one response to stdout.
///
/// Direct invocation (no stdin involved):
///   flex-confirm-mail-host -c fetch -p '{"path":"%ParentProcessDir%/rules.txt"}'
///   flex-confirm-mail-host -c choose-file --params-file dialog.yaml
///   flex-confirm-mail-host -c outlook-gpo-configs -d
///
/// Env:
///   FLEX_CONFIRM_MAIL_HOST_LOG_DIR   Directory for rotating logs (default: temp dir)
#[derive(Parser, Debug)]
#[command(
    name = "flex-confirm-mail-host",
    author,
    about = "FlexConfirmMail native messaging host",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print the version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Run one command directly instead of reading a request from stdin
    #[arg(short = 'c', long = "command", value_name = "NAME")]
    command: Option<String>,

    /// Command parameters as a JSON object
    #[arg(short = 'p', long = "params", value_name = "JSON")]
    params: Option<String>,

    /// Command parameters from a JSON or YAML file (--params keys win)
    #[arg(long = "params-file", value_name = "PATH")]
    params_file: Option<PathBuf>,

    /// Log debug output to stderr (direct invocation)
    #[arg(short, long)]
    debug: bool,

    /// Arguments appended by the browser (manifest path, extension id, ...)
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    _browser_args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let options = HostOptions {
        report_version: cli.version,
        command: cli.command,
        params: cli.params,
        params_file: cli.params_file,
        debug: cli.debug,
        log_dir: utils::log_dir_from(std::env::var_os(utils::LOG_DIR_ENV)),
    };

    let caps = Capabilities {
        locator: &SysinfoLocator,
        env: &ProcessEnv,
        chooser: &NativeFileChooser,
        policy: &NativePolicyStore,
    };

    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    let mut error_out = io::stderr().lock();
    let mut streams = Streams {
        input: &mut input,
        output: &mut output,
        error_out: &mut error_out,
    };
    Ok(host::run(&options, &mut streams, &caps)?)
}
