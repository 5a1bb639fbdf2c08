//! Daemon endpoint paired with the negotiated API version.

use std::fmt;

use dockwire_config::{Config, DaemonEndpoint, EndpointParseError, TransportKind};
use thiserror::Error;

/// Errors raised while building a [`ConnectionDescriptor`].
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The target could not be classified.
    #[error(transparent)]
    Endpoint(#[from] EndpointParseError),
    /// The API version was blank.
    #[error("API version must not be empty")]
    EmptyApiVersion,
    /// The API version contained characters other than digits and dots.
    #[error("invalid API version '{0}': expected digits separated by dots")]
    InvalidApiVersion(String),
}

/// Where the daemon lives and which API version to address.
///
/// Immutable once built; clone it freely to share between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    endpoint: DaemonEndpoint,
    api_version: String,
}

impl ConnectionDescriptor {
    /// Pairs an endpoint with an API version such as `1.39` or `v1.41`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::EmptyApiVersion`] or
    /// [`DescriptorError::InvalidApiVersion`] for an unusable version.
    pub fn new(endpoint: DaemonEndpoint, api_version: &str) -> Result<Self, DescriptorError> {
        Ok(Self {
            endpoint,
            api_version: normalise_api_version(api_version)?,
        })
    }

    /// Classifies `target` as a URL or socket path and pairs it with `api_version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockwire::ConnectionDescriptor;
    ///
    /// let descriptor = ConnectionDescriptor::from_target("/var/run/docker.sock", "1.39")
    ///     .expect("valid target");
    /// assert!(descriptor.endpoint().unix_path().is_some());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the target cannot be classified or
    /// the version is malformed.
    pub fn from_target(target: &str, api_version: &str) -> Result<Self, DescriptorError> {
        Self::new(DaemonEndpoint::classify(target)?, api_version)
    }

    /// Descriptor for a local socket path.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] for a blank path or a malformed version.
    pub fn unix(path: &str, api_version: &str) -> Result<Self, DescriptorError> {
        if path.trim().is_empty() {
            return Err(EndpointParseError::MissingTarget.into());
        }
        Self::new(DaemonEndpoint::unix(path.trim()), api_version)
    }

    /// Descriptor built from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the configured host or version is
    /// unusable.
    pub fn from_config(config: &Config) -> Result<Self, DescriptorError> {
        Self::new(config.endpoint()?, config.api_version())
    }

    /// Endpoint selected at construction.
    #[must_use]
    pub const fn endpoint(&self) -> &DaemonEndpoint {
        &self.endpoint
    }

    /// Transport the endpoint resolves to.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.endpoint.transport()
    }

    /// API version without the leading `v`.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Request target as sent on the wire, including any base URL path prefix.
    #[must_use]
    pub fn request_path(&self, target: &str) -> String {
        match &self.endpoint {
            DaemonEndpoint::Unix { .. } => target.to_owned(),
            DaemonEndpoint::Http { base } => {
                format!("{}{target}", base.path().trim_end_matches('/'))
            }
        }
    }

    /// Human-readable URL for a request target, used in results and logs.
    #[must_use]
    pub fn url_for(&self, target: &str) -> String {
        match &self.endpoint {
            DaemonEndpoint::Unix { path } => format!("unix://{path}{target}"),
            DaemonEndpoint::Http { base } => {
                format!("{}{target}", base.as_str().trim_end_matches('/'))
            }
        }
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} (API v{})", self.endpoint, self.api_version)
    }
}

fn normalise_api_version(raw: &str) -> Result<String, DescriptorError> {
    let trimmed = raw.trim();
    let version = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if version.is_empty() {
        return Err(DescriptorError::EmptyApiVersion);
    }
    let well_formed = version
        .split('.')
        .all(|part| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit()));
    if !well_formed {
        return Err(DescriptorError::InvalidApiVersion(raw.to_owned()));
    }
    Ok(version.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:2375", TransportKind::Tcp)]
    #[case("https://docker.example.com:2376", TransportKind::Tls)]
    #[case("tcp://10.0.0.5:2375", TransportKind::Tcp)]
    #[case("/var/run/docker.sock", TransportKind::UnixSocket)]
    #[case("unix:///run/user/1000/docker.sock", TransportKind::UnixSocket)]
    #[case("relative/docker.sock", TransportKind::UnixSocket)]
    fn targets_are_classified(#[case] target: &str, #[case] expected: TransportKind) {
        let descriptor = ConnectionDescriptor::from_target(target, "1.39").expect("descriptor");
        assert_eq!(descriptor.transport(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_target_is_rejected(#[case] target: &str) {
        let error = ConnectionDescriptor::from_target(target, "1.39").expect_err("blank");
        assert!(matches!(
            error,
            DescriptorError::Endpoint(EndpointParseError::MissingTarget)
        ));
    }

    #[rstest]
    #[case("1.39", "1.39")]
    #[case("v1.41", "1.41")]
    #[case(" 1.24 ", "1.24")]
    fn api_version_is_normalised(#[case] raw: &str, #[case] expected: &str) {
        let descriptor = ConnectionDescriptor::unix("/d.sock", raw).expect("descriptor");
        assert_eq!(descriptor.api_version(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("v")]
    #[case("1..39")]
    #[case("latest")]
    fn malformed_api_version_is_rejected(#[case] raw: &str) {
        assert!(ConnectionDescriptor::unix("/d.sock", raw).is_err());
    }

    #[test]
    fn urls_render_per_transport() {
        let unix = ConnectionDescriptor::unix("/var/run/docker.sock", "1.39").expect("unix");
        assert_eq!(
            unix.url_for("/v1.39/_ping"),
            "unix:///var/run/docker.sock/v1.39/_ping"
        );

        let http = ConnectionDescriptor::from_target("http://127.0.0.1:2375/", "1.39").expect("http");
        assert_eq!(http.url_for("/v1.39/info"), "http://127.0.0.1:2375/v1.39/info");
    }

    #[test]
    fn base_path_prefixes_request_target() {
        let proxied =
            ConnectionDescriptor::from_target("https://gw.example.com/docker/", "1.39").expect("url");
        assert_eq!(proxied.request_path("/v1.39/info"), "/docker/v1.39/info");

        let local = ConnectionDescriptor::unix("/d.sock", "1.39").expect("unix");
        assert_eq!(local.request_path("/v1.39/info"), "/v1.39/info");
    }

    #[test]
    fn config_defaults_produce_unix_descriptor() {
        let descriptor = ConnectionDescriptor::from_config(&Config::default()).expect("default");
        assert_eq!(descriptor.transport(), TransportKind::UnixSocket);
        assert_eq!(descriptor.api_version(), "1.39");
    }
}
