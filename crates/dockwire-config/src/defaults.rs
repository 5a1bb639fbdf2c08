use crate::endpoint::DaemonEndpoint;
use crate::logging::LogFormat;

/// Socket the engine listens on in a stock installation.
pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Engine API version requested when none is configured.
pub const DEFAULT_API_VERSION: &str = "1.39";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned daemon target used where allocation is required (e.g. serde).
#[must_use]
pub fn default_docker_host() -> String {
    DEFAULT_DOCKER_SOCKET.to_owned()
}

/// Owned API version used where allocation is required.
#[must_use]
pub fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_owned()
}

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Endpoint used when the configuration does not name one.
#[must_use]
pub fn default_endpoint() -> DaemonEndpoint {
    DaemonEndpoint::unix(DEFAULT_DOCKER_SOCKET)
}
