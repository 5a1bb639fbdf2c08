//! Command-line runtime for the dockwire Docker client.
//!
//! The runtime splits configuration flags from the command, loads layered
//! configuration, installs tracing and then runs one command against the
//! daemon. IO streams and the configuration loader can be substituted so the
//! whole flow is testable in-process.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use dockwire::DockerClient;

mod cli;
mod commands;
mod config;
mod errors;
mod telemetry;

use cli::Cli;
use config::{ConfigArgumentSplit, ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the fields of `dockwire_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--docker-host",
    "--api-version",
    "--log-filter",
    "--log-format",
];

/// Runs the CLI with the given arguments and IO streams.
///
/// Daemon documents go to `stdout`; diagnostics go to `stderr`.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&args, stdout, loader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error))
            if matches!(
                error.kind(),
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
            ) =>
        {
            if write!(stdout, "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::debug!(target: "dockwire::cli", %error, "command failed");
            if writeln!(stderr, "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write, L: ConfigLoader>(
    args: &[OsString],
    stdout: &mut W,
    loader: &L,
) -> Result<(), AppError> {
    let ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    } = split_config_arguments(args);
    let cli = Cli::try_parse_from(&command_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&config_arguments)?;
    telemetry::initialise(&config)?;
    let client = DockerClient::from_config(&config)?;
    commands::dispatch(&client, cli.command, stdout)
}
