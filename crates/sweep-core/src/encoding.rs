//! Canonical string encoding of factor/value mappings.
//!
//! Entries are written as `key VALSEP value` and joined with `KVSEP`, keys in
//! lexicographic order. List values join their elements with `VALSEP`. The
//! display form additionally abbreviates long lists; that form is lossy and is
//! rejected by the decoder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SweepError};
use crate::value::{Scalar, Value};

/// Default separator between key-value pairs.
pub const KEY_VALUE_SEP: &str = "__";
/// Default separator between a key and its value, and between list elements.
pub const VALUE_SEP: &str = "--";
/// Lists longer than this are abbreviated in the display form.
pub const MAX_LIST_LEN: usize = 5;
/// Marker inserted where elements were elided from an abbreviated list.
pub const LIST_BREAK: &str = "...";

/// Separator configuration for the canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separators {
    /// Joins `key VALSEP value` pairs.
    pub key_value: String,
    /// Separates a key from its value and list elements from one another.
    pub value: String,
    /// Marker used when abbreviating long lists for display.
    pub list_break: String,
    /// Longest list rendered in full by the display form.
    pub max_list_len: usize,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            key_value: KEY_VALUE_SEP.to_string(),
            value: VALUE_SEP.to_string(),
            list_break: LIST_BREAK.to_string(),
            max_list_len: MAX_LIST_LEN,
        }
    }
}

impl Separators {
    /// Returns true when `token` can be embedded in an encoding and recovered intact.
    ///
    /// Tokens must be non-empty, must not contain a separator or the break
    /// marker, and must not start or end with a separator character (which
    /// would merge with an adjacent separator).
    pub fn is_safe_token(&self, token: &str) -> bool {
        if token.is_empty()
            || token.contains(&self.key_value)
            || token.contains(&self.value)
            || token.contains(&self.list_break)
        {
            return false;
        }
        let edge_chars: Vec<char> = self.key_value.chars().chain(self.value.chars()).collect();
        let first = token.chars().next();
        let last = token.chars().last();
        !first.is_some_and(|c| edge_chars.contains(&c))
            && !last.is_some_and(|c| edge_chars.contains(&c))
    }

    fn render_value(&self, value: &Value) -> String {
        match value {
            Value::Single(scalar) => scalar.render(),
            Value::List(items) => items
                .iter()
                .map(Scalar::render)
                .collect::<Vec<_>>()
                .join(&self.value),
        }
    }

    fn render_abbreviated(&self, value: &Value) -> String {
        match value {
            Value::List(items) if items.len() > self.max_list_len => {
                let mut sorted = items.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let head = sorted[..self.max_list_len.saturating_sub(1)]
                    .iter()
                    .map(Scalar::render)
                    .collect::<Vec<_>>()
                    .join(&self.value);
                let last = sorted.last().map(Scalar::render).unwrap_or_default();
                format!("{head}{}{last}", self.list_break)
            }
            other => self.render_value(other),
        }
    }
}

/// Encodes entries in canonical (sorted-key, unabbreviated) form.
pub fn encode_entries(entries: &BTreeMap<String, Value>, seps: &Separators) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{key}{}{}", seps.value, seps.render_value(value)))
        .collect::<Vec<_>>()
        .join(&seps.key_value)
}

/// Renders entries in the human readable, possibly abbreviated, form.
pub fn display_entries(entries: &BTreeMap<String, Value>, seps: &Separators) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{key}{}{}", seps.value, seps.render_abbreviated(value)))
        .collect::<Vec<_>>()
        .join(&seps.key_value)
}

/// Recovers a scalar from its textual rendering by trying, in order:
/// boolean literal, then integer, then float, then string.
pub fn parse_scalar(text: &str) -> Scalar {
    match text {
        "True" | "true" => return Scalar::Bool(true),
        "False" | "false" => return Scalar::Bool(false),
        _ => {}
    }
    if let Ok(value) = text.parse::<i64>() {
        return Scalar::Int(value);
    }
    if looks_numeric(text) {
        if let Ok(value) = text.parse::<f64>() {
            return Scalar::Float(value);
        }
    }
    Scalar::Str(text.to_string())
}

// Rust accepts words such as "infinity" as floats; only the renderings we emit count.
fn looks_numeric(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit()) || matches!(text, "inf" | "-inf" | "NaN")
}

fn parse_error(message: impl Into<String>, input: &str) -> SweepError {
    SweepError::Parse(ErrorInfo::new("encoding.parse", message).with_context("input", input))
}

/// Decodes a canonical encoding back into its entries.
///
/// Fails on abbreviated input, on a pair without a key/value separator, on an
/// empty key or list element, and on repeated keys.
pub fn decode_entries(text: &str, seps: &Separators) -> Result<BTreeMap<String, Value>, SweepError> {
    if text.contains(&seps.list_break) {
        return Err(parse_error(
            "cannot decode an abbreviated list encoding",
            text,
        ));
    }
    let mut entries = BTreeMap::new();
    if text.is_empty() {
        return Ok(entries);
    }
    for pair in text.split(seps.key_value.as_str()) {
        let parts: Vec<&str> = pair.split(seps.value.as_str()).collect();
        if parts.len() < 2 {
            return Err(parse_error("wrong separator arity", pair));
        }
        let key = parts[0];
        if key.is_empty() {
            return Err(parse_error("empty key", pair));
        }
        let value = if parts.len() == 2 {
            if parts[1].is_empty() {
                Value::List(Vec::new())
            } else {
                Value::Single(parse_scalar(parts[1]))
            }
        } else {
            let mut items = Vec::with_capacity(parts.len() - 1);
            for part in &parts[1..] {
                if part.is_empty() {
                    return Err(parse_error("empty list element", pair));
                }
                items.push(parse_scalar(part));
            }
            Value::List(items)
        };
        if entries.insert(key.to_string(), value).is_some() {
            return Err(parse_error(format!("duplicate key {key}"), text));
        }
    }
    Ok(entries)
}
