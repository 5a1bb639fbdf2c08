//! Shared configuration for the dockwire client and command-line tool.
//!
//! Values are layered by `ortho_config`: built-in defaults, configuration
//! files, `DOCKWIRE_*` environment variables and finally command-line flags.

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_API_VERSION, DEFAULT_DOCKER_SOCKET, DEFAULT_LOG_FILTER, default_api_version,
    default_docker_host, default_endpoint, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use endpoint::{DaemonEndpoint, EndpointParseError, TransportKind};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration shared by the library consumers and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DOCKWIRE")]
pub struct Config {
    /// Daemon target: an `http(s)://` URL, a `tcp://` or `unix://` address,
    /// or a bare socket path.
    #[ortho_config(default = default_docker_host())]
    pub docker_host: String,
    /// Engine API version, for example `1.39`.
    #[ortho_config(default = default_api_version())]
    pub api_version: String,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docker_host: default_docker_host(),
            api_version: default_api_version(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Daemon target as configured.
    #[must_use]
    pub fn docker_host(&self) -> &str {
        &self.docker_host
    }

    /// Classifies the configured daemon target.
    pub fn endpoint(&self) -> Result<DaemonEndpoint, EndpointParseError> {
        DaemonEndpoint::classify(&self.docker_host)
    }

    /// Engine API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
