//! Daemon-wide operations: liveness, version, info, disk usage and events.

use serde_json::Value;

use super::{Outcome, expect_json, rejected};
use crate::call::{Call, CallError, Resource};
use crate::client::DockerClient;
use crate::framing::{Dispatcher, Framing};
use crate::query::Filters;
use crate::result::ErrorKind;
use crate::stream::EventStream;

/// Options for [`System::events`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsOptions {
    /// Replay events after this UNIX timestamp.
    pub since: Option<i64>,
    /// Stop after this UNIX timestamp; without it the stream is unbounded.
    pub until: Option<i64>,
    /// Server-side filters such as `type` or `container`.
    pub filters: Filters,
}

/// Daemon-wide operations bound to a client.
#[derive(Debug, Clone, Copy)]
pub struct System<'a> {
    client: &'a DockerClient,
}

impl<'a> System<'a> {
    pub(crate) const fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    fn get(&self, operation: &str) -> Outcome<Value> {
        let call = Call::new(Resource::System, operation);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Liveness probe.
    ///
    /// Anything other than a `200 OK` answer of `OK` from a reachable daemon
    /// is reported as [`ErrorKind::PingFailed`]; an unreachable daemon keeps
    /// [`ErrorKind::ConnectionFailed`].
    #[must_use]
    pub fn ping(&self) -> Outcome<()> {
        let mut result = self.client.execute(&Call::new(Resource::System, "_ping"));
        if !result.is_ok() {
            return Outcome {
                result,
                payload: None,
            };
        }
        let answered_ok = result.status() == Some(200)
            && result.response_body().map(str::trim) == Some("OK");
        if !answered_ok {
            let status = result
                .status()
                .map_or_else(|| String::from("none"), |status| status.to_string());
            result.fail(
                ErrorKind::PingFailed,
                format!("daemon did not answer OK (status {status})"),
            );
            result.log();
            return Outcome {
                result,
                payload: None,
            };
        }
        Outcome {
            result,
            payload: Some(()),
        }
    }

    /// Daemon and API versions.
    #[must_use]
    pub fn version(&self) -> Outcome<Value> {
        self.get("version")
    }

    /// System-wide information.
    #[must_use]
    pub fn info(&self) -> Outcome<Value> {
        self.get("info")
    }

    /// Disk usage of images, containers and volumes.
    #[must_use]
    pub fn df(&self) -> Outcome<Value> {
        self.get("system/df")
    }

    /// Subscribes to daemon events.
    ///
    /// Without `until` the daemon never closes the stream; stop iterating and
    /// drop the stream to cancel.
    #[must_use]
    pub fn events(&self, options: &EventsOptions) -> EventStream {
        let call = events_call(options.since, options.until, &options.filters);
        let mut stream = self.client.stream(&call, Framing::Lines);
        stream.require_status(&[200]);
        stream
    }

    /// Events within a closed time window, collected before returning.
    #[must_use]
    pub fn events_between(
        &self,
        since: Option<i64>,
        until: Option<i64>,
        filters: &Filters,
    ) -> Outcome<Vec<Value>> {
        let Some(until) = until else {
            return rejected(CallError::MissingArgument("until"));
        };
        if since.is_some_and(|since| since > until) {
            return rejected(CallError::InvalidArgument {
                name: "since",
                reason: format!("must not be later than until ({until})"),
            });
        }

        let call = events_call(since, Some(until), filters);
        let mut result = self.client.execute(&call);
        result.require_status(&[200]);
        if !result.is_ok() {
            return Outcome {
                result,
                payload: None,
            };
        }

        let mut dispatcher = Dispatcher::new(Framing::Lines);
        let body = result.response_body().unwrap_or_default().as_bytes();
        let mut events = match dispatcher.push(body) {
            Ok(events) => events,
            Err(error) => {
                result.fail(ErrorKind::AllocFailed, error.to_string());
                return Outcome {
                    result,
                    payload: None,
                };
            }
        };
        events.extend(dispatcher.finish());
        Outcome {
            result,
            payload: Some(events),
        }
    }
}

fn events_call(since: Option<i64>, until: Option<i64>, filters: &Filters) -> Call {
    let mut call = Call::new(Resource::System, "events");
    call.params_mut()
        .push_optional("since", since)
        .push_optional("until", until)
        .push_filters(filters);
    call
}
