//! CLI entrypoint for the dockwire Docker client.
//!
//! The binary delegates to [`dockwire_cli::run`], which loads configuration,
//! parses the command and prints daemon documents as they arrive.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    dockwire_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
