//! Per-invocation request description and REST path construction.

use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use thiserror::Error;

use crate::query::{FilterError, QueryParams};

/// Characters escaped inside an image reference. `/` and `:` stay literal
/// because references such as `library/redis:7` travel as raw path text.
const IMAGE_REFERENCE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped inside any other id; the id stays a single segment.
const ID_SEGMENT: &AsciiSet = &IMAGE_REFERENCE.add(b'/');

/// API area a call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `/containers/...`
    Containers,
    /// `/images/...`
    Images,
    /// System-level paths without a category prefix (`/_ping`, `/events`).
    System,
    /// `/volumes/...`
    Volumes,
}

impl Resource {
    /// Path segment naming the category, if it has one.
    #[must_use]
    pub const fn path_segment(self) -> Option<&'static str> {
        match self {
            Self::Containers => Some("containers"),
            Self::Images => Some("images"),
            Self::System => None,
            Self::Volumes => Some("volumes"),
        }
    }

    const fn id_escapes(self) -> &'static AsciiSet {
        match self {
            Self::Images => IMAGE_REFERENCE,
            Self::Containers | Self::System | Self::Volumes => ID_SEGMENT,
        }
    }

    const fn noun(self) -> &'static str {
        match self {
            Self::Containers => "container",
            Self::Images => "image",
            Self::System => "object",
            Self::Volumes => "volume",
        }
    }
}

/// HTTP method of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read.
    Get,
    /// State change or stream production.
    Post,
    /// Removal.
    Delete,
}

impl Method {
    /// Upper-case method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Payload sent with a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// JSON text, sent as `application/json`.
    Json(String),
    /// Opaque bytes such as a build context archive.
    Bytes {
        /// Value of the `Content-Type` header.
        content_type: String,
        /// Raw payload.
        data: Vec<u8>,
    },
}

impl RequestBody {
    /// Value of the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> &str {
        match self {
            Self::Json(_) => "application/json",
            Self::Bytes { content_type, .. } => content_type,
        }
    }

    /// Bytes written after the request head.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Json(text) => text.as_bytes(),
            Self::Bytes { data, .. } => data,
        }
    }

    /// Body as text, when it is JSON.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Json(text) => Some(text),
            Self::Bytes { .. } => None,
        }
    }
}

/// Errors detected before a call is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    /// An id was supplied but is blank.
    #[error("{0} id must not be blank")]
    BlankId(&'static str),
    /// A required argument was missing.
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),
    /// An argument had an unusable value.
    #[error("invalid value for '{name}': {reason}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// Filters were malformed.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// One API invocation: where it goes, what it carries, how it is sent.
#[derive(Debug, Clone)]
pub struct Call {
    resource: Resource,
    id: Option<String>,
    operation: String,
    params: QueryParams,
    method: Method,
    body: Option<RequestBody>,
}

impl Call {
    /// Starts a `GET` call for `operation` under `resource`.
    #[must_use]
    pub fn new(resource: Resource, operation: impl Into<String>) -> Self {
        Self {
            resource,
            id: None,
            operation: operation.into(),
            params: QueryParams::new(),
            method: Method::Get,
            body: None,
        }
    }

    /// Targets a specific resource instance.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the HTTP method.
    #[must_use]
    pub const fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Replaces the query parameters.
    #[must_use]
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_json_body(mut self, json: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Json(json.into()));
        self
    }

    /// Attaches an arbitrary body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Mutable access to the query parameters.
    pub fn params_mut(&mut self) -> &mut QueryParams {
        &mut self.params
    }

    /// API area addressed.
    #[must_use]
    pub const fn resource(&self) -> Resource {
        self.resource
    }

    /// Target instance, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Sub-method name (for example `json`, `logs`, `_ping`).
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Query parameters.
    #[must_use]
    pub const fn params(&self) -> &QueryParams {
        &self.params
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Checks the call can be sent.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::BlankId`] for a blank id and
    /// [`CallError::InvalidArgument`] for an id with a `.` or `..` segment.
    pub fn validate(&self) -> Result<(), CallError> {
        let Some(id) = self.id.as_deref().map(str::trim) else {
            return Ok(());
        };
        if id.is_empty() {
            return Err(CallError::BlankId(self.resource.noun()));
        }
        if id.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(CallError::InvalidArgument {
                name: "id",
                reason: format!("'{id}' contains a relative path segment"),
            });
        }
        Ok(())
    }

    /// Versioned REST path: `/v{api_version}/{category}/{id}/{operation}`.
    ///
    /// Empty parts are left out; an empty version yields an unversioned path.
    #[must_use]
    pub fn path(&self, api_version: &str) -> String {
        let version = (!api_version.is_empty()).then(|| format!("v{api_version}"));
        let id = self
            .id
            .as_deref()
            .map(|raw| utf8_percent_encode(raw.trim(), self.resource.id_escapes()).to_string());
        let segments = [
            version.as_deref(),
            self.resource.path_segment(),
            id.as_deref(),
            Some(self.operation.trim_matches('/')),
        ];

        let mut path = String::new();
        for segment in segments.into_iter().flatten().filter(|part| !part.is_empty()) {
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Request target: the path followed by the encoded query string.
    #[must_use]
    pub fn target(&self, api_version: &str) -> String {
        let mut target = self.path(api_version);
        if !self.params.is_empty() {
            target.push('?');
            target.push_str(&self.params.encode());
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn logs_call_builds_expected_target() {
        let mut call = Call::new(Resource::Containers, "logs").with_id("abc123");
        call.params_mut()
            .push_enabled("stdout", true)
            .push_number("tail", 10)
            .push_optional("since", None::<i64>);

        let target = call.target("1.39");
        let (path, query) = target.split_once('?').expect("query string");
        assert_eq!(path, "/v1.39/containers/abc123/logs");
        assert!(query.contains("stdout=true"));
        assert!(query.contains("tail=10"));
        assert!(!query.contains("since"));
    }

    #[rstest]
    #[case(Call::new(Resource::System, "_ping"), "/v1.39/_ping")]
    #[case(Call::new(Resource::System, "system/df"), "/v1.39/system/df")]
    #[case(Call::new(Resource::Volumes, ""), "/v1.39/volumes")]
    #[case(Call::new(Resource::Volumes, "").with_id("data"), "/v1.39/volumes/data")]
    #[case(
        Call::new(Resource::Containers, "").with_id("web").with_method(Method::Delete),
        "/v1.39/containers/web"
    )]
    #[case(
        Call::new(Resource::Images, "json").with_id("library/redis:7"),
        "/v1.39/images/library/redis:7/json"
    )]
    fn paths_omit_empty_segments(#[case] call: Call, #[case] expected: &str) {
        assert_eq!(call.path("1.39"), expected);
    }

    #[test]
    fn unversioned_path_when_version_is_empty() {
        let call = Call::new(Resource::System, "version");
        assert_eq!(call.path(""), "/version");
    }

    #[test]
    fn unsafe_id_characters_are_escaped() {
        let call = Call::new(Resource::Containers, "json").with_id("odd name?x");
        assert_eq!(call.path("1.39"), "/v1.39/containers/odd%20name%3Fx/json");
    }

    #[rstest]
    #[case(Resource::Containers, "../images/x", "/v1.39/containers/..%2Fimages%2Fx/json")]
    #[case(Resource::Volumes, "team/data", "/v1.39/volumes/team%2Fdata/json")]
    #[case(Resource::Images, "registry:5000/team/app", "/v1.39/images/registry:5000/team/app/json")]
    fn slashes_are_escaped_outside_image_references(
        #[case] resource: Resource,
        #[case] id: &str,
        #[case] expected: &str,
    ) {
        let call = Call::new(resource, "json").with_id(id);
        assert_eq!(call.path("1.39"), expected);
    }

    #[rstest]
    #[case(Resource::Containers, "..")]
    #[case(Resource::Volumes, ".")]
    #[case(Resource::Images, "library/../../containers/web")]
    fn relative_id_segments_are_rejected(#[case] resource: Resource, #[case] id: &str) {
        let call = Call::new(resource, "json").with_id(id);
        assert!(matches!(
            call.validate(),
            Err(CallError::InvalidArgument { name: "id", .. })
        ));
    }

    #[test]
    fn blank_id_is_rejected() {
        let call = Call::new(Resource::Containers, "start").with_id("  ");
        assert_eq!(call.validate(), Err(CallError::BlankId("container")));
    }

    #[test]
    fn json_body_reports_content_type() {
        let call = Call::new(Resource::Containers, "create")
            .with_method(Method::Post)
            .with_json_body(r#"{"Image":"alpine"}"#);
        let body = call.body().expect("body");
        assert_eq!(body.content_type(), "application/json");
        assert_eq!(body.text(), Some(r#"{"Image":"alpine"}"#));
    }
}
