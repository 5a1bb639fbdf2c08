//! Test support for exchange-level coverage.

mod fake_daemon;

use anyhow::Result;
use rstest::fixture;

use crate::DockerClient;

pub(super) use fake_daemon::{
    FakeDaemon, Step, chunk, chunked_head, closed_port, fixed_response, hang_up_port, last_chunk,
};

/// Transport a fake daemon listens on.
#[derive(Debug, Clone, Copy)]
pub(super) enum Listen {
    Tcp,
    #[cfg(unix)]
    Unix,
}

impl Listen {
    pub(super) fn spawn(self, script: Vec<Step>) -> Result<FakeDaemon> {
        match self {
            Self::Tcp => FakeDaemon::spawn_tcp(script),
            #[cfg(unix)]
            Self::Unix => FakeDaemon::spawn_unix(script),
        }
    }
}

/// Client bound to a running fake daemon.
pub(super) fn client_for(daemon: &FakeDaemon) -> Result<DockerClient> {
    Ok(DockerClient::connect(daemon.target(), "1.39")?)
}

#[fixture]
pub(super) fn ok_ping() -> Vec<Step> {
    fixed_response("200 OK", "OK")
}
