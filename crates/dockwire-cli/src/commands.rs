//! Executes parsed commands and prints the daemon's documents.
//!
//! Every document is written as one compact JSON line and flushed at once, so
//! streaming commands can be piped into line-oriented tools.

use std::io::Write;
use std::ops::ControlFlow;

use dockwire::{
    CallResult, DockerClient, EventStream, EventsOptions, Filters, ListContainersOptions, LogsOptions,
    PullOptions,
};
use serde_json::Value;
use tracing::debug;

use crate::AppError;
use crate::cli::Command;

pub(crate) fn dispatch<W: Write>(
    client: &DockerClient,
    command: Command,
    stdout: &mut W,
) -> Result<(), AppError> {
    debug!(target: "dockwire::cli", ?command, "dispatching command");
    match command {
        Command::Ping => {
            client.system().ping().into_payload()?;
            writeln!(stdout, "OK").map_err(AppError::WriteOutput)?;
            stdout.flush().map_err(AppError::WriteOutput)
        }
        Command::Version => write_document(stdout, &client.system().version().into_payload()?),
        Command::Info => write_document(stdout, &client.system().info().into_payload()?),
        Command::Ps {
            all,
            limit,
            filters,
        } => {
            let options = ListContainersOptions {
                all,
                limit,
                filters: parse_filters(&filters)?,
                ..ListContainersOptions::default()
            };
            write_listing(stdout, client.containers().list(&options).into_payload()?)
        }
        Command::Events {
            since,
            until,
            filters,
        } => {
            let filters = parse_filters(&filters)?;
            if until.is_some() {
                let events = client
                    .system()
                    .events_between(since, until, &filters)
                    .into_payload()?;
                events
                    .iter()
                    .try_for_each(|event| write_document(stdout, event))
            } else {
                let options = EventsOptions {
                    since,
                    until,
                    filters,
                };
                print_stream(client.system().events(&options), stdout)
            }
        }
        Command::Pull {
            image,
            tag,
            platform,
        } => {
            let options = PullOptions {
                platform,
                ..PullOptions::new(image, tag)
            };
            print_stream(client.images().pull(&options), stdout)
        }
        Command::Stats { container, stream } => {
            if stream {
                print_stream(client.containers().stats_stream(&container), stdout)
            } else {
                write_document(stdout, &client.containers().stats(&container).into_payload()?)
            }
        }
        Command::Logs {
            container,
            follow,
            tail,
            timestamps,
        } => {
            let options = LogsOptions {
                stdout: true,
                stderr: true,
                tail,
                timestamps,
                ..LogsOptions::default()
            };
            if follow {
                print_log_stream(client.containers().logs_stream(&container, &options), stdout)
            } else {
                let text = client.containers().logs(&container, &options).into_payload()?;
                write_text(stdout, &text)
            }
        }
        Command::Volumes { filters } => {
            let filters = parse_filters(&filters)?;
            write_document(stdout, &client.volumes().list(&filters).into_payload()?)
        }
    }
}

/// Parses repeated `NAME=VALUE` flags; the value may itself contain `=`.
fn parse_filters(raw: &[String]) -> Result<Filters, AppError> {
    let mut filters = Filters::new();
    for entry in raw {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| AppError::FilterSyntax(entry.clone()))?;
        filters.insert(name, value)?;
    }
    Ok(filters)
}

fn write_listing<W: Write>(stdout: &mut W, listing: Value) -> Result<(), AppError> {
    match listing {
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| write_document(stdout, item)),
        other => write_document(stdout, &other),
    }
}

fn write_document<W: Write>(stdout: &mut W, document: &Value) -> Result<(), AppError> {
    serde_json::to_writer(&mut *stdout, document)
        .map_err(|error| AppError::WriteOutput(error.into()))?;
    writeln!(stdout).map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}

fn write_text<W: Write>(stdout: &mut W, text: &str) -> Result<(), AppError> {
    stdout
        .write_all(text.as_bytes())
        .map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}

/// Prints the text of each log document as it arrives.
fn print_log_stream<W: Write>(stream: EventStream, stdout: &mut W) -> Result<(), AppError> {
    let mut write_error = None;
    let result = stream.for_each_document(|document| {
        let text = document.get("text").and_then(Value::as_str).unwrap_or_default();
        match write_text(stdout, text) {
            Ok(()) => ControlFlow::Continue(()),
            Err(error) => {
                write_error = Some(error);
                ControlFlow::Break(())
            }
        }
    });
    finish_stream(result, write_error)
}

fn print_stream<W: Write>(stream: EventStream, stdout: &mut W) -> Result<(), AppError> {
    let mut write_error = None;
    let result = stream.for_each_document(|document| match write_document(stdout, &document) {
        Ok(()) => ControlFlow::Continue(()),
        Err(error) => {
            write_error = Some(error);
            ControlFlow::Break(())
        }
    });
    finish_stream(result, write_error)
}

fn finish_stream(result: CallResult, write_error: Option<AppError>) -> Result<(), AppError> {
    if let Some(error) = write_error {
        return Err(error);
    }
    if result.is_ok() {
        Ok(())
    } else {
        Err(result.into())
    }
}
