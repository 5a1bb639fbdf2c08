//! `/containers` operations.

use serde_json::Value;

use super::{Outcome, expect_empty, expect_json, rejected};
use crate::call::{Call, CallError, Method, Resource};
use crate::client::DockerClient;
use crate::framing::Framing;
use crate::query::Filters;
use crate::result::ErrorKind;
use crate::stream::EventStream;

/// Options for [`Containers::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListContainersOptions {
    /// Include stopped containers.
    pub all: bool,
    /// Return at most this many of the most recent containers.
    pub limit: Option<u32>,
    /// Report container sizes.
    pub size: bool,
    /// Server-side filters such as `status` or `label`.
    pub filters: Filters,
}

/// Options for [`Containers::logs`] and [`Containers::logs_stream`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsOptions {
    /// Include standard output.
    pub stdout: bool,
    /// Include standard error.
    pub stderr: bool,
    /// Only lines after this UNIX timestamp.
    pub since: Option<i64>,
    /// Only lines before this UNIX timestamp.
    pub until: Option<i64>,
    /// Prefix lines with timestamps.
    pub timestamps: bool,
    /// Only this many lines from the end.
    pub tail: Option<u64>,
}

/// Options for [`Containers::remove`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveContainerOptions {
    /// Also remove anonymous volumes.
    pub volumes: bool,
    /// Kill the container first if it is running.
    pub force: bool,
    /// Remove a link instead of the container.
    pub link: bool,
}

/// State [`Containers::wait`] blocks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitCondition {
    /// Until the container is not running.
    #[default]
    NotRunning,
    /// Until the next exit.
    NextExit,
    /// Until the container is removed.
    Removed,
}

impl WaitCondition {
    /// Value of the `condition` parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotRunning => "not-running",
            Self::NextExit => "next-exit",
            Self::Removed => "removed",
        }
    }
}

/// Container operations bound to a client.
#[derive(Debug, Clone, Copy)]
pub struct Containers<'a> {
    client: &'a DockerClient,
}

impl<'a> Containers<'a> {
    pub(crate) const fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    fn call(id: &str, operation: &str) -> Call {
        Call::new(Resource::Containers, operation).with_id(id)
    }

    fn action(&self, id: &str, operation: &str, accepted: &[u16]) -> Outcome<()> {
        let call = Self::call(id, operation).with_method(Method::Post);
        expect_empty(self.client.execute(&call), accepted)
    }

    /// Lists containers.
    #[must_use]
    pub fn list(&self, options: &ListContainersOptions) -> Outcome<Value> {
        let mut call = Call::new(Resource::Containers, "json");
        call.params_mut()
            .push_enabled("all", options.all)
            .push_optional("limit", options.limit)
            .push_enabled("size", options.size)
            .push_filters(&options.filters);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Creates a container from a JSON configuration; the payload is its id.
    #[must_use]
    pub fn create(&self, name: Option<&str>, config: &Value) -> Outcome<String> {
        if !config.is_object() {
            return rejected(CallError::InvalidArgument {
                name: "config",
                reason: String::from("expected a JSON object"),
            });
        }
        let mut call = Call::new(Resource::Containers, "create")
            .with_method(Method::Post)
            .with_json_body(config.to_string());
        call.params_mut().push_optional("name", name);
        let outcome = expect_json(self.client.execute(&call), &[201]);
        let mut result = outcome.result;
        if !result.is_ok() {
            return Outcome {
                result,
                payload: None,
            };
        }
        let id = outcome
            .payload
            .as_ref()
            .and_then(|body| body.get("Id"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        if id.is_none() {
            result.fail(ErrorKind::UnknownError, "create response carries no container Id");
            result.log();
        }
        Outcome {
            result,
            payload: id,
        }
    }

    /// Low-level information about one container.
    #[must_use]
    pub fn inspect(&self, id: &str, size: bool) -> Outcome<Value> {
        let mut call = Self::call(id, "json");
        call.params_mut().push_enabled("size", size);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Processes running inside a container.
    #[must_use]
    pub fn top(&self, id: &str, ps_args: Option<&str>) -> Outcome<Value> {
        let mut call = Self::call(id, "top");
        call.params_mut().push_optional("ps_args", ps_args);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Log output collected up to now.
    ///
    /// Stream headers are stripped, so the payload holds only the log text,
    /// standard output and standard error interleaved in arrival order.
    #[must_use]
    pub fn logs(&self, id: &str, options: &LogsOptions) -> Outcome<String> {
        let call = match Self::logs_call(id, options, false) {
            Ok(call) => call,
            Err(error) => return rejected(error),
        };
        let mut stream = self.client.stream(&call, Framing::Multiplexed);
        stream.require_status(&[200]);
        let mut text = String::new();
        for document in stream.by_ref() {
            if let Some(chunk) = document.get("text").and_then(Value::as_str) {
                text.push_str(chunk);
            }
        }
        let result = stream.into_result();
        let payload = result.is_ok().then_some(text);
        Outcome { result, payload }
    }

    /// Follows the log output. Each document is
    /// `{"stream": "stdout" | "stderr" | "raw", "text": ...}`; the stream stays
    /// open until the container stops or the consumer drops it.
    #[must_use]
    pub fn logs_stream(&self, id: &str, options: &LogsOptions) -> EventStream {
        let call = match Self::logs_call(id, options, true) {
            Ok(call) => call,
            Err(error) => return EventStream::rejected(error.to_string(), Framing::Multiplexed),
        };
        let mut stream = self.client.stream(&call, Framing::Multiplexed);
        stream.require_status(&[200]);
        stream
    }

    fn logs_call(id: &str, options: &LogsOptions, follow: bool) -> Result<Call, CallError> {
        if !options.stdout && !options.stderr {
            return Err(CallError::InvalidArgument {
                name: "stdout/stderr",
                reason: String::from("select at least one output stream"),
            });
        }
        let mut call = Self::call(id, "logs");
        call.params_mut()
            .push_enabled("follow", follow)
            .push_enabled("stdout", options.stdout)
            .push_enabled("stderr", options.stderr)
            .push_optional("since", options.since)
            .push_optional("until", options.until)
            .push_enabled("timestamps", options.timestamps)
            .push_optional("tail", options.tail);
        Ok(call)
    }

    /// Filesystem changes since the container was created.
    #[must_use]
    pub fn changes(&self, id: &str) -> Outcome<Value> {
        expect_json(self.client.execute(&Self::call(id, "changes")), &[200])
    }

    /// One resource-usage sample.
    #[must_use]
    pub fn stats(&self, id: &str) -> Outcome<Value> {
        let mut call = Self::call(id, "stats");
        call.params_mut().push_flag("stream", false);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Resource-usage samples as the daemon produces them, about once a second.
    #[must_use]
    pub fn stats_stream(&self, id: &str) -> EventStream {
        let mut call = Self::call(id, "stats");
        call.params_mut().push_flag("stream", true);
        let mut stream = self.client.stream(&call, Framing::Concatenated);
        stream.require_status(&[200]);
        stream
    }

    /// Starts a container. An already running container is not an error.
    #[must_use]
    pub fn start(&self, id: &str, detach_keys: Option<&str>) -> Outcome<()> {
        let mut call = Self::call(id, "start").with_method(Method::Post);
        call.params_mut().push_optional("detachKeys", detach_keys);
        expect_empty(self.client.execute(&call), &[204, 304])
    }

    /// Stops a container, killing it after `timeout` seconds. An already
    /// stopped container is not an error.
    #[must_use]
    pub fn stop(&self, id: &str, timeout: Option<u32>) -> Outcome<()> {
        let mut call = Self::call(id, "stop").with_method(Method::Post);
        call.params_mut().push_optional("t", timeout);
        expect_empty(self.client.execute(&call), &[204, 304])
    }

    /// Restarts a container.
    #[must_use]
    pub fn restart(&self, id: &str, timeout: Option<u32>) -> Outcome<()> {
        let mut call = Self::call(id, "restart").with_method(Method::Post);
        call.params_mut().push_optional("t", timeout);
        expect_empty(self.client.execute(&call), &[204])
    }

    /// Sends a signal, `SIGKILL` unless another is named.
    #[must_use]
    pub fn kill(&self, id: &str, signal: Option<&str>) -> Outcome<()> {
        let mut call = Self::call(id, "kill").with_method(Method::Post);
        call.params_mut().push_optional("signal", signal);
        expect_empty(self.client.execute(&call), &[204])
    }

    /// Renames a container.
    #[must_use]
    pub fn rename(&self, id: &str, name: &str) -> Outcome<()> {
        if name.trim().is_empty() {
            return rejected(CallError::MissingArgument("name"));
        }
        let mut call = Self::call(id, "rename").with_method(Method::Post);
        call.params_mut().push("name", name.trim());
        expect_empty(self.client.execute(&call), &[204])
    }

    /// Suspends every process in a container.
    #[must_use]
    pub fn pause(&self, id: &str) -> Outcome<()> {
        self.action(id, "pause", &[204])
    }

    /// Resumes a paused container.
    #[must_use]
    pub fn unpause(&self, id: &str) -> Outcome<()> {
        self.action(id, "unpause", &[204])
    }

    /// Blocks until the container reaches `condition`; the payload carries
    /// the exit status.
    #[must_use]
    pub fn wait(&self, id: &str, condition: WaitCondition) -> Outcome<Value> {
        let mut call = Self::call(id, "wait").with_method(Method::Post);
        call.params_mut().push("condition", condition.as_str());
        expect_json(self.client.execute(&call), &[200])
    }

    /// Removes a container.
    #[must_use]
    pub fn remove(&self, id: &str, options: RemoveContainerOptions) -> Outcome<()> {
        let mut call = Self::call(id, "").with_method(Method::Delete);
        call.params_mut()
            .push_enabled("v", options.volumes)
            .push_enabled("force", options.force)
            .push_enabled("link", options.link);
        expect_empty(self.client.execute(&call), &[204])
    }
}
