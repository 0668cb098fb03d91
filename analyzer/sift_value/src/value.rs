//! The tagged value sum and its coercion matrix.
//!
//! Coercion accessors (`as_integer`, `as_double`, `as_string`, `as_bool`)
//! are lossy by contract: numeric parsing of strings falls back to zero,
//! and null converts to the target type's empty value. `synchronize`
//! widens along the rank chain `Bool < Int < Float < Str`; handles and
//! nulls never take part in promotion.

use std::fmt;

/// Runtime value in the sift expression engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Owned UTF-8 string.
    Str(String),
    /// Boolean.
    Bool(bool),
    /// Named opaque handle resolved against the owning runtime's globals.
    Ptr(String),
    /// Absent value; never equal to itself under `==`.
    Null,
}

/// Variant discriminant, used for column typing and promotion decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    Ptr,
    Null,
}

impl Value {
    /// Variant discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Ptr(_) => ValueKind::Ptr,
            Value::Null => ValueKind::Null,
        }
    }

    /// Variant name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "double",
            Value::Str(_) => "string",
            Value::Ptr(_) => "pointer",
            Value::Null => "null",
        }
    }

    /// Promotion rank along `bool < int < float < string`.
    ///
    /// Handles and nulls have no rank and never synchronize with other
    /// variants.
    fn rank(&self) -> Option<u8> {
        match self {
            Value::Bool(_) => Some(0),
            Value::Int(_) => Some(1),
            Value::Float(_) => Some(2),
            Value::Str(_) => Some(3),
            Value::Ptr(_) | Value::Null => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Integer view; strings are parsed, parse failure yields `0`.
    pub fn as_integer(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            #[allow(clippy::cast_possible_truncation, reason = "lossy view by contract")]
            Value::Float(v) => *v as i64,
            Value::Bool(v) => i64::from(*v),
            Value::Str(text) => text.trim().parse::<i64>().unwrap_or(0),
            Value::Ptr(_) | Value::Null => 0,
        }
    }

    /// Double view; strings are parsed, parse failure yields `0.0`.
    pub fn as_double(&self) -> f64 {
        match self {
            Value::Float(v) => *v,
            #[allow(clippy::cast_precision_loss, reason = "lossy view by contract")]
            Value::Int(v) => *v as f64,
            Value::Bool(v) => f64::from(u8::from(*v)),
            Value::Str(text) => text.trim().parse::<f64>().unwrap_or(0.0),
            Value::Ptr(_) | Value::Null => 0.0,
        }
    }

    /// String view; null renders as the empty string.
    pub fn as_string(&self) -> String {
        match self {
            Value::Str(text) => text.clone(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Bool(v) => if *v { "true" } else { "false" }.to_string(),
            Value::Ptr(name) => name.clone(),
            Value::Null => String::new(),
        }
    }

    /// Truthiness: non-zero numbers, non-empty strings (`"0"` and
    /// `"false"` excluded), `true` booleans.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(text) => !text.is_empty() && text != "0" && text != "false",
            Value::Ptr(_) => true,
            Value::Null => false,
        }
    }

    /// Widen this value in place to `target`.
    ///
    /// Only upward promotions along the rank chain occur in practice;
    /// the conversion itself is total for ranked variants.
    fn promote(&mut self, target: ValueKind) {
        let promoted = match target {
            ValueKind::Bool => Value::Bool(self.as_bool()),
            ValueKind::Int => Value::Int(self.as_integer()),
            ValueKind::Float => Value::Float(self.as_double()),
            ValueKind::Str => Value::Str(self.as_string()),
            ValueKind::Ptr | ValueKind::Null => return,
        };
        *self = promoted;
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(text) => f.write_str(text),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Ptr(name) => write!(f, "@{name}"),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    #[allow(clippy::cast_possible_wrap, reason = "row counts stay far below i64::MAX")]
    fn from(v: u64) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Bring two values to a common variant by widening the lesser-ranked one.
///
/// Returns `true` when both operands share a variant afterwards. Same
/// variants (including two nulls or two handles) are already synchronized;
/// a handle or null facing any other variant cannot be.
pub fn synchronize(left: &mut Value, right: &mut Value) -> bool {
    if left.kind() == right.kind() {
        return true;
    }
    let (Some(left_rank), Some(right_rank)) = (left.rank(), right.rank()) else {
        return false;
    };
    if left_rank < right_rank {
        left.promote(right.kind());
    } else {
        right.promote(left.kind());
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use super::{synchronize, Value, ValueKind};
    use pretty_assertions::assert_eq;

    // === Coercion views ===

    #[test]
    fn string_parses_to_numbers_with_zero_fallback() {
        assert_eq!(Value::Str("42".into()).as_integer(), 42);
        assert_eq!(Value::Str(" 7 ".into()).as_integer(), 7);
        assert_eq!(Value::Str("nope".into()).as_integer(), 0);
        assert_eq!(Value::Str("2.5".into()).as_double(), 2.5);
        assert_eq!(Value::Str("x".into()).as_double(), 0.0);
    }

    #[test]
    fn truthiness_matrix() {
        assert!(Value::Int(1).as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(Value::Str("yes".into()).as_bool());
        assert!(!Value::Str(String::new()).as_bool());
        assert!(!Value::Str("0".into()).as_bool());
        assert!(!Value::Str("false".into()).as_bool());
        assert!(!Value::Null.as_bool());
    }

    #[test]
    fn null_renders_empty() {
        assert_eq!(Value::Null.as_string(), "");
        assert_eq!(Value::Null.as_integer(), 0);
    }

    // === Synchronize ===

    #[test]
    fn widens_int_to_float() {
        let mut left = Value::Int(2);
        let mut right = Value::Float(0.5);
        assert!(synchronize(&mut left, &mut right));
        assert_eq!(left, Value::Float(2.0));
        assert_eq!(right, Value::Float(0.5));
    }

    #[test]
    fn widens_bool_to_int() {
        let mut left = Value::Bool(true);
        let mut right = Value::Int(5);
        assert!(synchronize(&mut left, &mut right));
        assert_eq!(left, Value::Int(1));
    }

    #[test]
    fn widens_number_to_string() {
        let mut left = Value::Str("a".into());
        let mut right = Value::Int(3);
        assert!(synchronize(&mut left, &mut right));
        assert_eq!(right, Value::Str("3".into()));
    }

    #[test]
    fn null_never_synchronizes_with_ranked() {
        let mut left = Value::Null;
        let mut right = Value::Int(1);
        assert!(!synchronize(&mut left, &mut right));
    }

    #[test]
    fn same_variant_is_already_synchronized() {
        let mut left = Value::Null;
        let mut right = Value::Null;
        assert!(synchronize(&mut left, &mut right));
        assert_eq!(left.kind(), ValueKind::Null);
    }

    #[test]
    fn synchronized_operands_share_variant() {
        let pairs = [
            (Value::Bool(true), Value::Float(2.0)),
            (Value::Int(1), Value::Str("1".into())),
            (Value::Float(0.5), Value::Str("x".into())),
        ];
        for (mut left, mut right) in pairs {
            assert!(synchronize(&mut left, &mut right));
            assert_eq!(left.kind(), right.kind());
        }
    }
}
