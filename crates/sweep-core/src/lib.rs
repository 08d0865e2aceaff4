#![deny(missing_docs)]
#![doc = "Condition-space value model for factorial sweeps: elemental values, canonical dictionaries, conditions, result records and result tables."]

pub mod dict;
pub mod encoding;
pub mod errors;
pub mod record;
pub mod schema;
pub mod table;
pub mod value;

pub use dict::{CanonicalDict, Condition};
pub use encoding::{parse_scalar, Separators, KEY_VALUE_SEP, LIST_BREAK, MAX_LIST_LEN, VALUE_SEP};
pub use errors::{ErrorInfo, SweepError};
pub use record::{ResultRecord, STATUS_KEY};
pub use schema::{Schema, SchemaBuilder};
pub use table::{Cell, ResultTable, TabularExport};
pub use value::{Scalar, Value};
