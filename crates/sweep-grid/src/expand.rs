use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sweep_core::{CanonicalDict, ErrorInfo, Scalar, SweepError, Value};

/// Sentinel meaning "every registered level of this factor".
pub const UNIVERSAL: &str = "all";

/// Static per-factor table resolving the universal sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionTable {
    entries: BTreeMap<String, Vec<Scalar>>,
}

impl ExpansionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the full level list for a factor.
    pub fn with<I, T>(mut self, factor: impl Into<String>, levels: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        self.insert(factor, levels);
        self
    }

    /// Registers or replaces the full level list for a factor.
    pub fn insert<I, T>(&mut self, factor: impl Into<String>, levels: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        self.entries
            .insert(factor.into(), levels.into_iter().map(Into::into).collect());
    }

    /// Returns the registered levels for a factor.
    pub fn get(&self, factor: &str) -> Option<&[Scalar]> {
        self.entries.get(factor).map(Vec::as_slice)
    }

    /// Iterates over registered factors.
    pub fn factors(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// One factor of a hypercube and its candidate levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// Factor name.
    pub name: String,
    /// Candidate levels, never empty.
    pub levels: Vec<Scalar>,
}

impl Factor {
    /// Convenience constructor.
    pub fn new<I, T>(name: impl Into<String>, levels: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        Self {
            name: name.into(),
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }
}

/// A factor space in which every factor maps to a non-empty list of levels.
///
/// Factor order is significant: enumeration varies the last factor fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Factor>", into = "Vec<Factor>")]
pub struct Hypercube {
    factors: Vec<Factor>,
}

impl TryFrom<Vec<Factor>> for Hypercube {
    type Error = SweepError;

    fn try_from(factors: Vec<Factor>) -> Result<Self, Self::Error> {
        Hypercube::from_factors(factors)
    }
}

impl From<Hypercube> for Vec<Factor> {
    fn from(cube: Hypercube) -> Self {
        cube.factors
    }
}

impl Hypercube {
    /// Builds a hypercube from factors in the given order.
    ///
    /// Fails when a factor name repeats, a level list is empty, or a name or
    /// level cannot be encoded losslessly.
    pub fn from_factors(factors: Vec<Factor>) -> Result<Self, SweepError> {
        let mut names = BTreeSet::new();
        let mut as_dict = BTreeMap::new();
        for factor in &factors {
            if !names.insert(factor.name.as_str()) {
                return Err(SweepError::InvalidKey(
                    ErrorInfo::new("hypercube.duplicate_factor", "factor declared twice")
                        .with_context("factor", factor.name.clone()),
                ));
            }
            if factor.levels.is_empty() {
                return Err(empty_levels(&factor.name));
            }
            as_dict.insert(factor.name.clone(), Value::List(factor.levels.clone()));
        }
        CanonicalDict::from_map(as_dict)?;
        Ok(Self { factors })
    }

    /// Factors in enumeration order.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Looks up the levels of one factor.
    pub fn levels(&self, name: &str) -> Option<&[Scalar]> {
        self.factors
            .iter()
            .find(|factor| factor.name == name)
            .map(|factor| factor.levels.as_slice())
    }

    /// Number of conditions: the product of the level-list lengths.
    pub fn len(&self) -> usize {
        self.factors
            .iter()
            .fold(1usize, |acc, factor| acc.saturating_mul(factor.levels.len()))
    }

    /// A hypercube always holds at least one point (the empty condition when
    /// it has no factors).
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Names of factors with more than one level.
    pub fn multivalued_factors(&self) -> Vec<&str> {
        self.factors
            .iter()
            .filter(|factor| factor.levels.len() > 1)
            .map(|factor| factor.name.as_str())
            .collect()
    }

    /// Renders the hypercube as a list-valued canonical dictionary.
    pub fn to_dict(&self) -> CanonicalDict {
        // Names and levels were validated by `from_factors`.
        let entries = self
            .factors
            .iter()
            .map(|factor| (factor.name.clone(), Value::List(factor.levels.clone())))
            .collect();
        CanonicalDict::from_map_unchecked(entries)
    }
}

fn empty_levels(factor: &str) -> SweepError {
    SweepError::InvalidValue(
        ErrorInfo::new("hypercube.empty_levels", "factor has no levels")
            .with_context("factor", factor),
    )
}

/// Resolves universal sentinels and promotes scalars to singleton lists.
///
/// Factors appear in the dictionary's (lexicographic) key order.
pub fn expand(dict: &CanonicalDict, table: &ExpansionTable) -> Result<Hypercube, SweepError> {
    let mut factors = Vec::with_capacity(dict.len());
    for (name, value) in dict.iter() {
        let levels = if value.is_sentinel(UNIVERSAL) {
            match table.get(name) {
                Some(levels) => levels.to_vec(),
                None => {
                    return Err(SweepError::MissingExpansion(
                        ErrorInfo::new(
                            "expand.missing_entry",
                            format!("no expansion registered for `{name}`"),
                        )
                        .with_context("factor", name)
                        .with_hint(format!(
                            "registered factors: {}",
                            table.factors().collect::<Vec<_>>().join(", ")
                        )),
                    ))
                }
            }
        } else {
            value.levels()
        };
        if levels.is_empty() {
            return Err(empty_levels(name));
        }
        factors.push(Factor {
            name: name.to_string(),
            levels,
        });
    }
    Hypercube::from_factors(factors)
}
