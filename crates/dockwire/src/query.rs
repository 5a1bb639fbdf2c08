//! Query-string parameters and the engine's `filters` convention.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde_json::{Map, Value};
use thiserror::Error;
use url::form_urlencoded;

/// Name of the parameter carrying JSON-encoded filters.
pub const FILTERS_PARAM: &str = "filters";

/// Errors raised while assembling filters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// A filter was given without a name.
    #[error("filter names must not be empty")]
    EmptyName,
    /// A filter value was empty.
    #[error("filter '{name}' has an empty value")]
    EmptyValue {
        /// Name of the offending filter.
        name: String,
    },
}

/// Ordered mapping from filter name to one or many values.
///
/// Serialises to the engine's `{"name":["value",...]}` form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    entries: BTreeMap<String, Vec<String>>,
}

impl Filters {
    /// Creates an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds filters from `(name, value)` pairs; repeated names accumulate.
    ///
    /// # Errors
    ///
    /// Returns the first [`FilterError`] raised by [`Self::insert`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut filters = Self::new();
        for (name, value) in pairs {
            filters.insert(name, value)?;
        }
        Ok(filters)
    }

    /// Adds a value under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptyName`] for a blank name and
    /// [`FilterError::EmptyValue`] for an empty value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, FilterError> {
        let key: String = name.into();
        let entry: String = value.into();
        if key.trim().is_empty() {
            return Err(FilterError::EmptyName);
        }
        if entry.is_empty() {
            return Err(FilterError::EmptyValue { name: key });
        }
        self.entries.entry(key).or_default().push(entry);
        Ok(self)
    }

    /// Builder form of [`Self::insert`].
    ///
    /// # Errors
    ///
    /// Fails like [`Self::insert`].
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, FilterError> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Values recorded under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Whether no filter has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compact JSON encoding.
    #[must_use]
    pub fn to_json(&self) -> String {
        let object: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, values)| {
                let array = values.iter().cloned().map(Value::String).collect();
                (name.clone(), Value::Array(array))
            })
            .collect();
        Value::Object(object).to_string()
    }
}

/// Ordered key/value pairs destined for the query string.
///
/// Empty values are dropped on insertion so absent options never reach the
/// daemon as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Creates an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a textual parameter unless `value` is empty.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let text: String = value.into();
        if !text.is_empty() {
            self.pairs.push((key.into(), text));
        }
        self
    }

    /// Appends an explicit boolean, rendered as `true` or `false`.
    pub fn push_flag(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.push(key, if value { "true" } else { "false" })
    }

    /// Appends `key=true` only when `enabled`.
    pub fn push_enabled(&mut self, key: impl Into<String>, enabled: bool) -> &mut Self {
        if enabled {
            self.push(key, "true");
        }
        self
    }

    /// Appends a number in decimal form.
    pub fn push_number(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.push(key, value.to_string())
    }

    /// Appends a value when present.
    pub fn push_optional<T: Display>(&mut self, key: impl Into<String>, value: Option<T>) -> &mut Self {
        if let Some(present) = value {
            self.push(key, present.to_string());
        }
        self
    }

    /// Appends `filters` unless the set is empty.
    pub fn push_filters(&mut self, filters: &Filters) -> &mut Self {
        if !filters.is_empty() {
            self.push(FILTERS_PARAM, filters.to_json());
        }
        self
    }

    /// First value recorded under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of recorded pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Form-urlencoded query string without the leading `?`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}
