// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Deterministic query string building
//!
//! Keys keep insertion order. Strings are used verbatim, numbers and booleans
//! are rendered as text, arrays and objects are JSON-encoded, and nulls are
//! skipped.

use serde_json::Value;
use url::Url;

/// Ordered set of query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter; `null` values are skipped
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// Append a parameter in place; `null` values are skipped
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        if let Some(rendered) = render(value.into()) {
            self.pairs.push((key.into(), rendered));
        }
        self
    }

    /// Rendered value of the first parameter named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no parameter is set
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over rendered `(key, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Append the parameters to `url`'s query string
    pub fn apply(&self, url: &mut Url) {
        if !self.is_empty() {
            url.query_pairs_mut().extend_pairs(self.iter());
        }
    }
}

fn render(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}
