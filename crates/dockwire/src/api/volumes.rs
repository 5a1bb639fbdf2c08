//! `/volumes` operations.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::{Outcome, expect_empty, expect_json, rejected};
use crate::call::{Call, Method, Resource};
use crate::client::DockerClient;
use crate::query::{FilterError, Filters};

/// Options for [`Volumes::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateVolumeOptions {
    /// Volume name; the daemon generates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Volume driver, `local` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Metadata labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Options for [`Volumes::prune`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneVolumesOptions {
    /// Only prune volumes carrying these labels (`key` or `key=value`).
    pub labels: Vec<String>,
    /// Keep volumes carrying these labels.
    pub excluded_labels: Vec<String>,
}

impl PruneVolumesOptions {
    fn filters(&self) -> Result<Filters, FilterError> {
        let included = self.labels.iter().map(|label| ("label", label));
        let excluded = self.excluded_labels.iter().map(|label| ("label!", label));
        Filters::from_pairs(included.chain(excluded).map(|(name, value)| (name, value.as_str())))
    }
}

/// Volume operations bound to a client.
#[derive(Debug, Clone, Copy)]
pub struct Volumes<'a> {
    client: &'a DockerClient,
}

impl<'a> Volumes<'a> {
    pub(crate) const fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    /// Lists volumes, narrowed by `dangling`, `driver`, `label` or `name`
    /// filters.
    #[must_use]
    pub fn list(&self, filters: &Filters) -> Outcome<Value> {
        let mut call = Call::new(Resource::Volumes, "");
        call.params_mut().push_filters(filters);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Creates a volume.
    #[must_use]
    pub fn create(&self, options: &CreateVolumeOptions) -> Outcome<Value> {
        let body = match serde_json::to_string(options) {
            Ok(body) => body,
            Err(error) => return rejected(error),
        };
        let call = Call::new(Resource::Volumes, "create")
            .with_method(Method::Post)
            .with_json_body(body);
        expect_json(self.client.execute(&call), &[201])
    }

    /// Low-level information about one volume.
    #[must_use]
    pub fn inspect(&self, name: &str) -> Outcome<Value> {
        let call = Call::new(Resource::Volumes, "").with_id(name);
        expect_json(self.client.execute(&call), &[200])
    }

    /// Removes a volume.
    #[must_use]
    pub fn remove(&self, name: &str, force: bool) -> Outcome<()> {
        let mut call = Call::new(Resource::Volumes, "")
            .with_id(name)
            .with_method(Method::Delete);
        call.params_mut().push_enabled("force", force);
        expect_empty(self.client.execute(&call), &[204])
    }

    /// Deletes unused volumes; the payload is the number of bytes reclaimed.
    #[must_use]
    pub fn prune(&self, options: &PruneVolumesOptions) -> Outcome<u64> {
        let filters = match options.filters() {
            Ok(filters) => filters,
            Err(error) => return rejected(error),
        };
        let mut call = Call::new(Resource::Volumes, "prune").with_method(Method::Post);
        call.params_mut().push_filters(&filters);
        let outcome = expect_json(self.client.execute(&call), &[200]);
        let reclaimed = outcome
            .payload
            .as_ref()
            .map(|body| body.get("SpaceReclaimed").and_then(Value::as_u64).unwrap_or_default());
        Outcome {
            result: outcome.result,
            payload: reclaimed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ErrorKind;

    #[test]
    fn create_body_uses_engine_field_names() {
        let options = CreateVolumeOptions {
            name: Some(String::from("data")),
            driver: None,
            labels: BTreeMap::from([(String::from("env"), String::from("prod"))]),
        };
        let body = serde_json::to_string(&options).expect("serialise");
        assert_eq!(body, r#"{"Name":"data","Labels":{"env":"prod"}}"#);
    }

    #[test]
    fn prune_filters_negate_excluded_labels() {
        let options = PruneVolumesOptions {
            labels: vec![String::from("tmp")],
            excluded_labels: vec![String::from("keep=yes")],
        };
        let filters = options.filters().expect("filters");
        assert_eq!(filters.to_json(), r#"{"label":["tmp"],"label!":["keep=yes"]}"#);
    }

    #[test]
    fn empty_prune_label_is_rejected() {
        let client = DockerClient::connect("/nonexistent/dockwire-test.sock", "1.39").expect("client");
        let options = PruneVolumesOptions {
            labels: vec![String::new()],
            excluded_labels: Vec::new(),
        };
        let outcome = client.volumes().prune(&options);
        assert_eq!(outcome.result.kind(), ErrorKind::InvalidInput);
    }
}
