//! Result records: a condition together with its outcome metrics.

use std::sync::Arc;

use crate::dict::{CanonicalDict, Condition};
use crate::errors::SweepError;
use crate::schema::Schema;
use crate::value::{Scalar, Value};

/// Name of the field recording success or the reason for failure.
pub const STATUS_KEY: &str = "status";

/// Single-valued dictionary over the union of condition factors and metrics.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    schema: Arc<Schema>,
    fields: CanonicalDict,
}

impl ResultRecord {
    /// Creates a record with every field unassigned.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            fields: CanonicalDict::default(),
        }
    }

    /// Creates a record seeded with the levels of `condition`.
    pub fn from_condition(schema: Arc<Schema>, condition: &Condition) -> Result<Self, SweepError> {
        let mut record = Self::new(schema);
        for (key, level) in condition.levels() {
            record.set(key, level.clone())?;
        }
        Ok(record)
    }

    /// Assigns a field. Fails when the key is not part of the result schema.
    pub fn set(&mut self, key: &str, value: impl Into<Scalar>) -> Result<(), SweepError> {
        self.fields
            .set(&self.schema, key, Value::Single(value.into()))
    }

    /// Assigns an outcome field such as a metric or the status.
    ///
    /// Only the key is checked: outcome text is stored verbatim, including
    /// separators or an empty string, so it never rejects an evaluator's
    /// failure reason.
    pub fn set_outcome(&mut self, key: &str, value: impl Into<Scalar>) -> Result<(), SweepError> {
        self.fields
            .set_opaque(&self.schema, key, Value::Single(value.into()))
    }

    /// Returns an assigned field.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.get(key).and_then(Value::as_single)
    }

    /// Status text, when assigned.
    pub fn status(&self) -> Option<&str> {
        self.get(STATUS_KEY).and_then(Scalar::as_str)
    }

    /// True when no field of the schema is left unassigned.
    pub fn is_complete(&self) -> bool {
        self.schema.keys().all(|key| self.fields.contains_key(key))
    }

    /// Iterates over assigned fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields
            .iter()
            .filter_map(|(key, value)| value.as_single().map(|scalar| (key, scalar)))
    }

    /// Extracts the condition part of the record.
    pub fn condition<'a>(
        &self,
        factors: impl IntoIterator<Item = &'a str>,
    ) -> Result<Condition, SweepError> {
        Condition::try_from(self.fields.project(factors))
    }

    /// Canonical encoding of the assigned fields. Outcome text set through
    /// [`ResultRecord::set_outcome`] is not guaranteed to decode back.
    pub fn encode(&self) -> String {
        self.fields.encode()
    }

    /// The schema the record validates against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl PartialEq for ResultRecord {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}
