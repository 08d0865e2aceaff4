#![deny(missing_docs)]
#![doc = "Hypercube expansion, deterministic condition enumeration and exclusion sets."]

/// Odometer enumeration over hypercube points.
pub mod enumerate;
/// Exclusion sets built from hypercubes of skipped levels.
pub mod exclusion;
/// Universal-sentinel expansion and the hypercube type.
pub mod expand;

pub use enumerate::Conditions;
pub use exclusion::Exclusion;
pub use expand::{expand, ExpansionTable, Factor, Hypercube, UNIVERSAL};
