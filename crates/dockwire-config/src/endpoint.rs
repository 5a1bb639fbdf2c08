use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Location of the container daemon's API.
///
/// The transport is decided once, by syntactic inspection of the target
/// string, and never changes afterwards.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum DaemonEndpoint {
    /// Unix domain socket endpoint.
    Unix { path: Utf8PathBuf },
    /// TCP endpoint, optionally secured with TLS when the scheme is `https`.
    Http { base: Url },
}

/// Transport family selected for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Local unix domain socket.
    UnixSocket,
    /// Plain TCP.
    Tcp,
    /// TCP wrapped in TLS.
    Tls,
}

impl DaemonEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Classifies a target string.
    ///
    /// Absolute `http`/`https` URLs select TCP (with TLS for `https`). The
    /// `DOCKER_HOST` forms `unix:///path` and `tcp://host:port` are accepted
    /// too. Anything else is taken to be a socket path.
    pub fn classify(target: &str) -> Result<Self, EndpointParseError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(EndpointParseError::MissingTarget);
        }

        let Ok(url) = Url::parse(target) else {
            return Ok(Self::unix(target));
        };
        match url.scheme() {
            "http" | "https" => {
                if url.host_str().is_none() {
                    return Err(EndpointParseError::MissingHost(target.to_owned()));
                }
                Ok(Self::Http { base: url })
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| EndpointParseError::MissingHost(target.to_owned()))?;
                let port = url
                    .port()
                    .ok_or_else(|| EndpointParseError::MissingPort(target.to_owned()))?;
                let base = Url::parse(&format!("http://{host}:{port}"))?;
                Ok(Self::Http { base })
            }
            "unix" => {
                let path = url.path();
                if path.is_empty() || path == "/" {
                    return Err(EndpointParseError::MissingUnixPath(target.to_owned()));
                }
                Ok(Self::unix(path))
            }
            _ => Ok(Self::unix(target)),
        }
    }

    /// Returns the transport family used for this endpoint.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        match self {
            Self::Unix { .. } => TransportKind::UnixSocket,
            Self::Http { base } if base.scheme() == "https" => TransportKind::Tls,
            Self::Http { .. } => TransportKind::Tcp,
        }
    }

    /// Returns the socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Http { .. } => None,
        }
    }

    /// Returns the base URL when the endpoint uses TCP.
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        match self {
            Self::Http { base } => Some(base),
            Self::Unix { .. } => None,
        }
    }
}

impl fmt::Display for DaemonEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Http { base } => formatter.write_str(base.as_str().trim_end_matches('/')),
        }
    }
}

impl FromStr for DaemonEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::classify(input)
    }
}

/// Errors encountered while classifying a [`DaemonEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Neither a URL nor a socket path was supplied.
    #[error("no daemon URL or socket path was supplied")]
    MissingTarget,
    /// TCP host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// TCP port was missing from a `tcp://` address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:2375", TransportKind::Tcp)]
    #[case("http://10.0.0.7:2375/", TransportKind::Tcp)]
    #[case("https://docker.example.com:2376", TransportKind::Tls)]
    #[case("HTTPS://docker.example.com", TransportKind::Tls)]
    #[case("tcp://127.0.0.1:2375", TransportKind::Tcp)]
    fn urls_select_tcp(#[case] target: &str, #[case] expected: TransportKind) {
        let endpoint = DaemonEndpoint::classify(target).expect("url should classify");
        assert_eq!(endpoint.transport(), expected);
        assert!(endpoint.base_url().is_some());
    }

    #[rstest]
    #[case("/var/run/docker.sock", "/var/run/docker.sock")]
    #[case("docker.sock", "docker.sock")]
    #[case("./run/docker.sock", "./run/docker.sock")]
    #[case("  /tmp/engine.sock  ", "/tmp/engine.sock")]
    #[case("unix:///run/user/1000/docker.sock", "/run/user/1000/docker.sock")]
    fn paths_select_unix_socket(#[case] target: &str, #[case] expected: &str) {
        let endpoint = DaemonEndpoint::classify(target).expect("path should classify");
        assert_eq!(endpoint.transport(), TransportKind::UnixSocket);
        assert_eq!(endpoint.unix_path(), Some(Utf8Path::new(expected)));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_targets_are_rejected(#[case] target: &str) {
        let error = DaemonEndpoint::classify(target).expect_err("blank target must fail");
        assert!(matches!(error, EndpointParseError::MissingTarget));
    }

    #[test]
    fn tcp_without_port_is_rejected() {
        let error = DaemonEndpoint::classify("tcp://docker.internal")
            .expect_err("tcp endpoint needs a port");
        assert!(matches!(error, EndpointParseError::MissingPort(_)));
    }

    #[test]
    fn display_unix_socket() {
        let endpoint = DaemonEndpoint::unix("/var/run/docker.sock");
        assert_eq!(endpoint.to_string(), "unix:///var/run/docker.sock");
    }

    #[test]
    fn display_http_trims_trailing_slash() {
        let endpoint: DaemonEndpoint = "http://127.0.0.1:2375".parse().expect("parse");
        assert_eq!(endpoint.to_string(), "http://127.0.0.1:2375");
    }
}
