//! `/images` and `/build` operations.

use serde_json::Value;

use super::{Outcome, expect_json};
use crate::call::{Call, CallError, Method, RequestBody, Resource};
use crate::client::DockerClient;
use crate::framing::Framing;
use crate::query::Filters;
use crate::stream::EventStream;

const TAR_CONTENT_TYPE: &str = "application/x-tar";

/// Options for [`Images::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListImagesOptions {
    /// Include intermediate layers.
    pub all: bool,
    /// Report repository digests.
    pub digests: bool,
    /// Server-side filters such as `dangling` or `reference`.
    pub filters: Filters,
}

/// Options for [`Images::pull`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Image reference, for example `library/redis`.
    pub image: String,
    /// Tag to pull; the daemon pulls every tag when absent.
    pub tag: Option<String>,
    /// Platform in `os[/arch[/variant]]` form.
    pub platform: Option<String>,
}

impl PullOptions {
    /// Pulls `image` at `tag`.
    #[must_use]
    pub fn new(image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tag: Some(tag.into()),
            platform: None,
        }
    }
}

/// Options for [`Images::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Path of the Dockerfile inside the context.
    pub dockerfile: Option<String>,
    /// `name:tag` applied to the result.
    pub tag: Option<String>,
    /// Do not use the build cache.
    pub no_cache: bool,
    /// Pull newer base images.
    pub pull: bool,
}

/// Image operations bound to a client.
#[derive(Debug, Clone, Copy)]
pub struct Images<'a> {
    client: &'a DockerClient,
}

impl<'a> Images<'a> {
    pub(crate) const fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    /// Lists images.
    #[must_use]
    pub fn list(&self, options: &ListImagesOptions) -> Outcome<Value> {
        let mut call = Call::new(Resource::Images, "json");
        call.params_mut()
            .push_enabled("all", options.all)
            .push_enabled("digests", options.digests)
            .push_filters(&options.filters);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Low-level information about one image.
    #[must_use]
    pub fn inspect(&self, name: &str) -> Outcome<Value> {
        let call = Call::new(Resource::Images, "json").with_id(name);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Pulls an image, yielding progress documents as they arrive.
    #[must_use]
    pub fn pull(&self, options: &PullOptions) -> EventStream {
        if options.image.trim().is_empty() {
            return EventStream::rejected(
                CallError::MissingArgument("image").to_string(),
                Framing::Concatenated,
            );
        }
        let mut call = Call::new(Resource::Images, "create").with_method(Method::Post);
        call.params_mut()
            .push("fromImage", options.image.trim())
            .push_optional("tag", options.tag.as_deref())
            .push_optional("platform", options.platform.as_deref());
        let mut stream = self.client.stream(&call, Framing::Concatenated);
        stream.require_status(&[200]);
        stream
    }

    /// Builds an image from a tar archive of the build context.
    #[must_use]
    pub fn build(&self, context: Vec<u8>, options: &BuildOptions) -> EventStream {
        if context.is_empty() {
            return EventStream::rejected(
                CallError::MissingArgument("context").to_string(),
                Framing::Concatenated,
            );
        }
        let mut call = Call::new(Resource::System, "build")
            .with_method(Method::Post)
            .with_body(RequestBody::Bytes {
                content_type: String::from(TAR_CONTENT_TYPE),
                data: context,
            });
        call.params_mut()
            .push_optional("dockerfile", options.dockerfile.as_deref())
            .push_optional("t", options.tag.as_deref())
            .push_enabled("nocache", options.no_cache)
            .push_enabled("pull", options.pull);
        let mut stream = self.client.stream(&call, Framing::Concatenated);
        stream.require_status(&[200]);
        stream
    }
}
