use std::collections::BTreeMap;
use std::iter::FromIterator;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sweep_core::SweepError;

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes with sorted object keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SweepError> {
    let value =
        serde_json::to_value(value).map_err(|err| SweepError::serde("json.serialize", err))?;
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonicalize(value))
        .map_err(|err| SweepError::serde("json.write", err))?;
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SweepError> {
    serde_json::from_slice(data).map_err(|err| SweepError::serde("json.deserialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SweepError> {
    serde_yaml::from_slice(data).map_err(|err| SweepError::serde("yaml.deserialize", err))
}
