//! The explicit client value every operation runs through.

use dockwire_config::Config;

use crate::api::{Containers, Images, System, Volumes};
use crate::call::Call;
use crate::descriptor::{ConnectionDescriptor, DescriptorError};
use crate::framing::Framing;
use crate::result::{CallResult, ErrorKind};
use crate::stream::EventStream;
use crate::transport;

/// Handle on one daemon.
///
/// Holds only the read-only [`ConnectionDescriptor`]; every call opens its
/// own connection, so a client can be shared between threads by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerClient {
    descriptor: ConnectionDescriptor,
}

impl DockerClient {
    /// Wraps an existing descriptor.
    #[must_use]
    pub const fn new(descriptor: ConnectionDescriptor) -> Self {
        Self { descriptor }
    }

    /// Classifies `target` and pairs it with `api_version`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the target or version is unusable.
    pub fn connect(target: &str, api_version: &str) -> Result<Self, DescriptorError> {
        ConnectionDescriptor::from_target(target, api_version).map(Self::new)
    }

    /// Builds a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the configured host or version is
    /// unusable.
    pub fn from_config(config: &Config) -> Result<Self, DescriptorError> {
        ConnectionDescriptor::from_config(config).map(Self::new)
    }

    /// Endpoint and API version in use.
    #[must_use]
    pub const fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Runs `call` and buffers the whole response.
    ///
    /// HTTP error statuses are returned as completed exchanges; inspect
    /// [`CallResult::status`] to interpret them.
    #[must_use]
    pub fn execute(&self, call: &Call) -> CallResult {
        transport::execute(&self.descriptor, call)
    }

    /// Runs `call` and yields response documents as they arrive.
    #[must_use]
    pub fn stream(&self, call: &Call, framing: Framing) -> EventStream {
        EventStream::open(&self.descriptor, call, framing)
    }

    /// Container operations.
    #[must_use]
    pub const fn containers(&self) -> Containers<'_> {
        Containers::new(self)
    }

    /// Image operations.
    #[must_use]
    pub const fn images(&self) -> Images<'_> {
        Images::new(self)
    }

    /// Daemon-wide operations.
    #[must_use]
    pub const fn system(&self) -> System<'_> {
        System::new(self)
    }

    /// Volume operations.
    #[must_use]
    pub const fn volumes(&self) -> Volumes<'_> {
        Volumes::new(self)
    }
}

impl DescriptorError {
    /// Outcome classification for a descriptor that could not be built.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }

    /// Result recording the failure, for callers that report every outcome
    /// through [`CallResult`].
    #[must_use]
    pub fn to_result(&self) -> CallResult {
        CallResult::rejected(self.to_string())
    }
}
