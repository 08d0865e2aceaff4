//! Elemental value model: the only value shapes a canonical dictionary accepts.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A single elemental level: string, integer, float or boolean.
///
/// Non-finite floats serialize as `{"float": "NaN"}` (or `inf`, `-inf`) since
/// JSON has no literal for them. Two NaN levels compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ScalarRepr", into = "ScalarRepr")]
pub enum Scalar {
    /// Boolean flag, rendered as `True` / `False`.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number, always rendered with a fractional part or exponent.
    Float(f64),
    /// Free-form text.
    Str(String),
}

impl Scalar {
    /// Renders the scalar in the textual form used by the canonical encoding.
    pub fn render(&self) -> String {
        match self {
            Scalar::Bool(true) => "True".to_string(),
            Scalar::Bool(false) => "False".to_string(),
            Scalar::Int(value) => value.to_string(),
            // Debug keeps `2.0` distinct from the integer `2`.
            Scalar::Float(value) => format!("{value:?}"),
            Scalar::Str(value) => value.clone(),
        }
    }

    /// Returns the string payload when the scalar is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer payload when the scalar is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns a numeric view of integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(value) => Some(*value as f64),
            Scalar::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Short tag naming the variant, used when a rendering alone is ambiguous.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "str",
        }
    }

    /// Total ordering used when sorting levels for display.
    ///
    /// Booleans sort before numbers, numbers before strings. Integers and
    /// floats compare numerically.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        fn rank(scalar: &Scalar) -> u8 {
            match scalar {
                Scalar::Bool(_) => 0,
                Scalar::Int(_) | Scalar::Float(_) => 1,
                Scalar::Str(_) => 2,
            }
        }
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::Str(a), Scalar::Str(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                let lhs = a.as_f64().unwrap_or_default();
                let rhs = b.as_f64().unwrap_or_default();
                lhs.total_cmp(&rhs)
                    .then_with(|| matches!(a, Scalar::Float(_)).cmp(&matches!(b, Scalar::Float(_))))
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ScalarRepr {
    Bool(bool),
    Int(i64),
    Float(f64),
    NonFinite { float: String },
    Str(String),
}

impl TryFrom<ScalarRepr> for Scalar {
    type Error = String;

    fn try_from(repr: ScalarRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            ScalarRepr::Bool(value) => Scalar::Bool(value),
            ScalarRepr::Int(value) => Scalar::Int(value),
            ScalarRepr::Float(value) => Scalar::Float(value),
            ScalarRepr::NonFinite { float } => match float.parse::<f64>() {
                Ok(value) if !value.is_finite() => Scalar::Float(value),
                _ => return Err(format!("`{float}` is not a non-finite float")),
            },
            ScalarRepr::Str(value) => Scalar::Str(value),
        })
    }
}

impl From<Scalar> for ScalarRepr {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool(value) => ScalarRepr::Bool(value),
            Scalar::Int(value) => ScalarRepr::Int(value),
            Scalar::Float(value) if value.is_finite() => ScalarRepr::Float(value),
            Scalar::Float(value) => ScalarRepr::NonFinite {
                float: format!("{value:?}"),
            },
            Scalar::Str(value) => ScalarRepr::Str(value),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

/// An elemental value: either one scalar or an ordered list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A single level.
    Single(Scalar),
    /// An ordered list of levels.
    List(Vec<Scalar>),
}

impl Value {
    /// Builds a list value from anything convertible into scalars.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns true when the value is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Returns the scalar when the value holds exactly one level without a list.
    pub fn as_single(&self) -> Option<&Scalar> {
        match self {
            Value::Single(scalar) => Some(scalar),
            Value::List(_) => None,
        }
    }

    /// Returns the levels of the value, promoting a scalar to a singleton list.
    pub fn levels(&self) -> Vec<Scalar> {
        match self {
            Value::Single(scalar) => vec![scalar.clone()],
            Value::List(items) => items.clone(),
        }
    }

    /// Returns true when the value is the given string sentinel.
    pub fn is_sentinel(&self, sentinel: &str) -> bool {
        matches!(self, Value::Single(Scalar::Str(text)) if text == sentinel)
    }
}

macro_rules! single_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Single(Scalar::from(value))
                }
            }
        )*
    };
}

single_value_from!(bool, i64, i32, u32, f64, &str, String);

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Single(value)
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(items: Vec<Scalar>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_render_with_fraction() {
        assert_eq!(Scalar::Float(2.0).render(), "2.0");
        assert_eq!(Scalar::Float(0.5).render(), "0.5");
        assert_eq!(Scalar::Int(2).render(), "2");
        assert_eq!(Scalar::Bool(true).render(), "True");
    }

    #[test]
    fn numeric_levels_sort_numerically() {
        let mut levels = vec![Scalar::Int(10), Scalar::Float(2.5), Scalar::Int(-1)];
        levels.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(
            levels,
            vec![Scalar::Int(-1), Scalar::Float(2.5), Scalar::Int(10)]
        );
    }

    #[test]
    fn non_finite_floats_survive_json() {
        let levels = Value::list([f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.5]);
        let text = serde_json::to_string(&levels).expect("serialize");
        assert!(!text.contains("null"));
        let back: Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, levels);
        let nan: Scalar = serde_json::from_str(r#"{"float":"NaN"}"#).expect("parse");
        assert_eq!(nan, Scalar::Float(f64::NAN));
        assert!(serde_json::from_str::<Scalar>(r#"{"float":"2.0"}"#).is_err());
    }

    #[test]
    fn untagged_json_keeps_variants() {
        let value: Value = serde_json::from_str("[1, 2.0, true, \"x\"]").expect("parse");
        assert_eq!(
            value,
            Value::List(vec![
                Scalar::Int(1),
                Scalar::Float(2.0),
                Scalar::Bool(true),
                Scalar::Str("x".into()),
            ])
        );
    }
}
