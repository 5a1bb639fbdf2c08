//! Blocking client for the Docker Engine API.
//!
//! The crate turns a logical operation into one HTTP/1.1 exchange with the
//! daemon over a unix socket, TCP or TLS, and splits long-lived response
//! bodies into JSON documents as they arrive. Every call produces a
//! [`CallResult`], whether or not the daemon was reached.
//!
//! ```no_run
//! use dockwire::{DockerClient, EventsOptions};
//!
//! let client = DockerClient::connect("/var/run/docker.sock", "1.39")?;
//! let ping = client.system().ping();
//! if !ping.is_ok() {
//!     eprintln!("{}", ping.result);
//! }
//! for event in client.system().events(&EventsOptions::default()).take(5) {
//!     println!("{event}");
//! }
//! # Ok::<(), dockwire::DescriptorError>(())
//! ```

mod api;
mod buffer;
mod call;
mod client;
mod descriptor;
pub mod framing;
mod query;
mod result;
mod stream;
mod transport;

#[cfg(test)]
mod tests;

pub use api::{
    BuildOptions, Containers, CreateVolumeOptions, EventsOptions, Images, ListContainersOptions,
    ListImagesOptions, LogsOptions, Outcome, PruneVolumesOptions, PullOptions,
    RemoveContainerOptions, System, Volumes, WaitCondition,
};
pub use buffer::{AllocError, ResponseBuffer};
pub use call::{Call, CallError, Method, RequestBody, Resource};
pub use client::DockerClient;
pub use descriptor::{ConnectionDescriptor, DescriptorError};
pub use dockwire_config::{DaemonEndpoint, TransportKind};
pub use framing::{Dispatcher, Framing, StreamCursor, StreamState};
pub use query::{FILTERS_PARAM, FilterError, Filters, QueryParams};
pub use result::{CallResult, ErrorKind};
pub use stream::EventStream;
pub use transport::TransportError;
