use std::collections::HashSet;

use sweep_core::Condition;

use crate::expand::Hypercube;

/// Set of (possibly partial) conditions to skip during enumeration.
///
/// A condition is excluded when its projection onto the exclusion's factors
/// encodes to one of the exclusion's points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusion {
    factors: Vec<String>,
    encodings: HashSet<String>,
}

impl Exclusion {
    /// An exclusion that skips nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds the exclusion set implied by a hypercube of excluded levels.
    /// A hypercube without factors excludes nothing.
    pub fn from_hypercube(cube: &Hypercube) -> Self {
        if cube.factors().is_empty() {
            return Self::none();
        }
        Self {
            factors: cube.factors().iter().map(|f| f.name.clone()).collect(),
            encodings: cube.conditions().map(|c| c.encode()).collect(),
        }
    }

    /// Returns true when the exclusion skips nothing.
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    /// Number of excluded (partial) conditions.
    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    /// Returns true when `condition` matches an excluded point.
    pub fn excludes(&self, condition: &Condition) -> bool {
        if self.is_empty() {
            return false;
        }
        if self
            .factors
            .iter()
            .any(|factor| condition.get(factor).is_none())
        {
            return false;
        }
        let projected = condition.project(self.factors.iter().map(String::as_str));
        self.encodings.contains(&projected.encode())
    }
}
