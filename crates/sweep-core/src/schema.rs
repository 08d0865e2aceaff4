//! Immutable schema descriptors naming the permitted keys of a dictionary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SweepError};
use crate::value::Value;

/// Permitted keys and their optional default values.
///
/// A key whose default is `None` is permitted but left unassigned when the
/// caller omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: BTreeMap<String, Option<Value>>,
}

impl Schema {
    /// Starts building a schema with the given descriptive name.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builds the union of several schemas.
    ///
    /// Later defaults override earlier ones; a key declared without a default
    /// never erases an existing default.
    pub fn union<'a>(name: impl Into<String>, parts: impl IntoIterator<Item = &'a Schema>) -> Self {
        let mut fields = BTreeMap::new();
        for part in parts {
            for (key, default) in &part.fields {
                match fields.get(key) {
                    Some(Some(_)) if default.is_none() => {}
                    _ => {
                        fields.insert(key.clone(), default.clone());
                    }
                }
            }
        }
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Descriptive name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when the key is permitted.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterates over permitted keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of permitted keys.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the schema permits no keys.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the default value for a key, if it has one.
    pub fn default_for(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).and_then(Option::as_ref)
    }

    /// Iterates over keys that carry a default value.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .filter_map(|(key, default)| default.as_ref().map(|value| (key.as_str(), value)))
    }

    /// Fails with [`SweepError::InvalidKey`] when the key is not permitted.
    pub fn check_key(&self, key: &str) -> Result<(), SweepError> {
        if self.contains(key) {
            Ok(())
        } else {
            Err(SweepError::InvalidKey(
                ErrorInfo::new("schema.invalid_key", format!("key `{key}` is not permitted"))
                    .with_context("schema", self.name.clone())
                    .with_context("key", key)
                    .with_hint(format!(
                        "permitted keys: {}",
                        self.keys().collect::<Vec<_>>().join(", ")
                    )),
            ))
        }
    }
}

/// Incremental builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: BTreeMap<String, Option<Value>>,
}

impl SchemaBuilder {
    /// Declares a key with a default value.
    pub fn field(mut self, key: impl Into<String>, default: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), Some(default.into()));
        self
    }

    /// Declares a key that stays unassigned unless supplied.
    pub fn optional(mut self, key: impl Into<String>) -> Self {
        self.fields.insert(key.into(), None);
        self
    }

    /// Finalises the schema.
    pub fn build(self) -> Schema {
        Schema {
            name: self.name,
            fields: self.fields,
        }
    }
}
