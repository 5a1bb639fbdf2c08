//! Socket establishment for the three daemon transports.
//!
//! Every transport is wrapped in a uniform [`Connection`] so the HTTP layer
//! never needs to know whether it talks to a socket file, a TCP port or a TLS
//! session.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use dockwire_config::DaemonEndpoint;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use url::{Host, Url};

#[cfg(unix)]
use camino::Utf8Path;
#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};
#[cfg(unix)]
use tokio::net::UnixStream;

use super::TransportError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) enum Connection {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
            #[cfg(unix)]
            Self::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
            #[cfg(unix)]
            Self::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
            #[cfg(unix)]
            Self::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
            #[cfg(unix)]
            Self::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Opens the socket for `endpoint`, completing the TLS handshake for
/// `https` targets. Must run inside a tokio runtime.
pub(crate) async fn connect(endpoint: &DaemonEndpoint) -> Result<Connection, TransportError> {
    match endpoint {
        DaemonEndpoint::Http { base } => {
            let stream = connect_tcp(base).await?;
            if base.scheme() == "https" {
                connect_tls(base, stream).await
            } else {
                Ok(Connection::Tcp(stream))
            }
        }
        DaemonEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path).map_err(|source| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                Err(TransportError::UnsupportedUnixTransport(endpoint.to_string()))
            }
        }
    }
}

/// Value of the `Host` header for an endpoint.
pub(crate) fn host_header(endpoint: &DaemonEndpoint) -> String {
    match endpoint {
        DaemonEndpoint::Unix { .. } => String::from("localhost"),
        DaemonEndpoint::Http { base } => {
            let host = base.host_str().unwrap_or("localhost");
            base.port()
                .map_or_else(|| host.to_owned(), |port| format!("{host}:{port}"))
        }
    }
}

async fn connect_tcp(base: &Url) -> Result<TcpStream, TransportError> {
    let endpoint = base.as_str().trim_end_matches('/').to_owned();
    let addresses = resolve_tcp_addresses(base).map_err(|source| TransportError::Resolve {
        endpoint: endpoint.clone(),
        source,
    })?;

    let mut last_error = io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses");
    for address in addresses {
        match tokio::time::timeout(CONNECTION_TIMEOUT, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(error)) => last_error = error,
            Err(_) => {
                last_error = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no answer from {address} within {CONNECTION_TIMEOUT:?}"),
                );
            }
        }
    }
    Err(TransportError::Connect {
        endpoint,
        source: last_error,
    })
}

fn resolve_tcp_addresses(base: &Url) -> io::Result<Vec<SocketAddr>> {
    let addresses = base.socket_addrs(|| None)?;
    if addresses.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no resolved addresses",
        ));
    }
    Ok(addresses)
}

fn tls_connector(host: &str) -> Result<TlsConnector, TransportError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|source| TransportError::Tls {
            endpoint: host.to_owned(),
            source,
        })?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

async fn connect_tls(base: &Url, stream: TcpStream) -> Result<Connection, TransportError> {
    let host = match base.host() {
        Some(Host::Domain(domain)) => domain.to_owned(),
        Some(Host::Ipv4(address)) => address.to_string(),
        Some(Host::Ipv6(address)) => address.to_string(),
        None => String::new(),
    };
    let server_name = ServerName::try_from(host.clone())
        .map_err(|_| TransportError::InvalidServerName(host.clone()))?;

    let session = tls_connector(&host)?
        .connect(server_name, stream)
        .await
        .map_err(|source| TransportError::Handshake {
            endpoint: host,
            source,
        })?;
    Ok(Connection::Tls(Box::new(session)))
}

/// Connects with a bounded wait, then hands the socket to tokio.
#[cfg(unix)]
fn connect_unix(path: &Utf8Path) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path.as_std_path())?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    socket.set_nonblocking(true)?;
    let stream = UnixStream::from_std(std::os::unix::net::UnixStream::from(socket))?;
    Ok(Connection::Unix(stream))
}
