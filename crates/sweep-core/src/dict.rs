//! Canonical dictionaries and single-valued conditions.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::encoding::{decode_entries, display_entries, encode_entries, Separators};
use crate::errors::{ErrorInfo, SweepError};
use crate::schema::Schema;
use crate::value::{Scalar, Value};

/// A validated mapping from factor name to elemental value.
///
/// Equality and hashing go through the canonical encoding, so two
/// dictionaries built in different orders compare equal when their content
/// does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct CanonicalDict {
    entries: BTreeMap<String, Value>,
}

impl CanonicalDict {
    /// Validates `entries` against `schema` and fills defaults for missing keys.
    pub fn new<I, K, V>(schema: &Schema, entries: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::with_separators(schema, entries, &Separators::default())
    }

    /// Same as [`CanonicalDict::new`] but validates tokens against custom separators.
    pub fn with_separators<I, K, V>(
        schema: &Schema,
        entries: I,
        seps: &Separators,
    ) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            schema.check_key(&key)?;
            map.insert(key, value.into());
        }
        for (key, default) in schema.defaults() {
            if !map.contains_key(key) {
                map.insert(key.to_string(), default.clone());
            }
        }
        validate(&map, seps)?;
        Ok(Self { entries: map })
    }

    /// Validates values only, for mappings whose keys come from a trusted source
    /// such as another validated dictionary.
    pub fn from_map(entries: BTreeMap<String, Value>) -> Result<Self, SweepError> {
        validate(&entries, &Separators::default())?;
        Ok(Self { entries })
    }

    /// Wraps entries without re-validating them.
    ///
    /// The entries must come from an already validated source such as a
    /// hypercube; otherwise the encoding may not decode back.
    pub fn from_map_unchecked(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }

    /// Parses a canonical encoding and validates it against `schema`.
    pub fn decode(schema: &Schema, text: &str) -> Result<Self, SweepError> {
        Self::decode_with(schema, text, &Separators::default())
    }

    /// Parses an encoding written with custom separators.
    pub fn decode_with(schema: &Schema, text: &str, seps: &Separators) -> Result<Self, SweepError> {
        let entries = decode_entries(text, seps)?;
        Self::with_separators(schema, entries, seps)
    }

    /// Canonical, unabbreviated encoding. Stable identity key for the content.
    pub fn encode(&self) -> String {
        encode_entries(&self.entries, &Separators::default())
    }

    /// Canonical encoding using custom separators.
    pub fn encode_with(&self, seps: &Separators) -> String {
        encode_entries(&self.entries, seps)
    }

    /// Human readable form. Long lists are abbreviated, so this is not decodable.
    pub fn display(&self) -> String {
        display_entries(&self.entries, &Separators::default())
    }

    /// Equality by canonical encoding.
    pub fn equals(&self, other: &CanonicalDict) -> bool {
        self.encode() == other.encode()
    }

    /// Looks up the value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns true when the key is assigned.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Iterates over assigned keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of assigned keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no key is assigned.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Assigns a value after checking the key against `schema`.
    pub fn set(
        &mut self,
        schema: &Schema,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), SweepError> {
        let key = key.into();
        schema.check_key(&key)?;
        let value = value.into();
        validate_value(&key, &value, &Separators::default())?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Assigns a value after checking only the key. The value may hold text
    /// that does not survive [`CanonicalDict::decode`].
    pub(crate) fn set_opaque(
        &mut self,
        schema: &Schema,
        key: &str,
        value: Value,
    ) -> Result<(), SweepError> {
        schema.check_key(key)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Restricts the dictionary to the given keys. Unknown keys are ignored.
    pub fn project<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> CanonicalDict {
        let entries = keys
            .into_iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect();
        CanonicalDict { entries }
    }

    /// Borrows the underlying ordered map.
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }
}

fn validate(entries: &BTreeMap<String, Value>, seps: &Separators) -> Result<(), SweepError> {
    for (key, value) in entries {
        if !seps.is_safe_token(key) {
            return Err(SweepError::InvalidKey(
                ErrorInfo::new("dict.unsafe_key", "key cannot be encoded losslessly")
                    .with_context("key", key.clone()),
            ));
        }
        validate_value(key, value, seps)?;
    }
    Ok(())
}

fn validate_value(key: &str, value: &Value, seps: &Separators) -> Result<(), SweepError> {
    let scalars: &[Scalar] = match value {
        Value::Single(scalar) => std::slice::from_ref(scalar),
        Value::List(items) => items,
    };
    for scalar in scalars {
        if let Scalar::Str(text) = scalar {
            if !seps.is_safe_token(text) {
                return Err(SweepError::InvalidValue(
                    ErrorInfo::new("dict.unsafe_value", "string level cannot be encoded losslessly")
                        .with_context("key", key)
                        .with_context("value", text.clone())
                        .with_hint(format!(
                            "avoid empty strings, `{}`, `{}`, `{}` and leading or trailing separator characters",
                            seps.key_value, seps.value, seps.list_break
                        )),
                ));
            }
        }
    }
    Ok(())
}

impl PartialEq for CanonicalDict {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for CanonicalDict {}

impl Hash for CanonicalDict {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encode().hash(state);
    }
}

impl Display for CanonicalDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl TryFrom<BTreeMap<String, Value>> for CanonicalDict {
    type Error = SweepError;

    fn try_from(entries: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        CanonicalDict::from_map(entries)
    }
}

impl From<CanonicalDict> for BTreeMap<String, Value> {
    fn from(dict: CanonicalDict) -> Self {
        dict.entries
    }
}

/// One fully specified point of the factor space: a single level per factor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CanonicalDict", into = "CanonicalDict")]
pub struct Condition(CanonicalDict);

impl Condition {
    /// Validates single-valued entries against `schema`, filling defaults.
    pub fn new<I, K, V>(schema: &Schema, entries: I) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Condition::try_from(CanonicalDict::new(schema, entries)?)
    }

    /// Builds a condition from levels that already passed validation elsewhere.
    pub fn from_levels(levels: BTreeMap<String, Scalar>) -> Result<Self, SweepError> {
        let entries = levels
            .into_iter()
            .map(|(key, scalar)| (key, Value::Single(scalar)))
            .collect();
        Ok(Condition(CanonicalDict::from_map(entries)?))
    }

    /// Builds a condition without re-validating its tokens.
    ///
    /// The keys and levels must come from an already validated source such as
    /// a hypercube; otherwise the encoding may not decode back.
    pub fn from_levels_unchecked(levels: BTreeMap<String, Scalar>) -> Self {
        Condition(CanonicalDict {
            entries: levels
                .into_iter()
                .map(|(key, scalar)| (key, Value::Single(scalar)))
                .collect(),
        })
    }

    /// Parses a condition from its canonical encoding.
    pub fn decode(schema: &Schema, text: &str) -> Result<Self, SweepError> {
        Condition::try_from(CanonicalDict::decode(schema, text)?)
    }

    /// Returns the level of a factor.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key).and_then(Value::as_single)
    }

    /// Canonical encoding of the condition.
    pub fn encode(&self) -> String {
        self.0.encode()
    }

    /// Restricts the condition to a subset of its factors.
    pub fn project<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Condition {
        Condition(self.0.project(keys))
    }

    /// Iterates over factor levels in key order.
    pub fn levels(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0
            .iter()
            .filter_map(|(key, value)| value.as_single().map(|scalar| (key, scalar)))
    }

    /// Borrows the underlying dictionary.
    pub fn as_dict(&self) -> &CanonicalDict {
        &self.0
    }
}

impl TryFrom<CanonicalDict> for Condition {
    type Error = SweepError;

    fn try_from(dict: CanonicalDict) -> Result<Self, Self::Error> {
        if let Some((key, _)) = dict.iter().find(|(_, value)| value.is_list()) {
            return Err(SweepError::InvalidValue(
                ErrorInfo::new("condition.multivalued", "a condition holds one level per factor")
                    .with_context("key", key),
            ));
        }
        Ok(Condition(dict))
    }
}

impl From<Condition> for CanonicalDict {
    fn from(condition: Condition) -> Self {
        condition.0
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.encode())
    }
}
