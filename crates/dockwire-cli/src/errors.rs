use std::io;
use std::sync::Arc;

use dockwire::{CallResult, DescriptorError, FilterError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("invalid connection settings: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("invalid filter '{0}': expected NAME=VALUE")]
    FilterSyntax(String),
    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),
    #[error("{0}")]
    Call(Box<CallResult>),
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}

impl From<Box<CallResult>> for AppError {
    fn from(result: Box<CallResult>) -> Self {
        Self::Call(result)
    }
}

impl From<CallResult> for AppError {
    fn from(result: CallResult) -> Self {
        Self::Call(Box::new(result))
    }
}
