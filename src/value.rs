//! Values and types shared by the query tree, the IR and command parameters.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Static type of an expression.
///
/// The `Display` form is the name used in method signatures
/// (`String.Substring(Int32, Int32)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    Char,
    String,
    DateTime,
    DateOnly,
    TimeSpan,
    Object,
    /// A mapped domain type (one row of a table).
    Entity(String),
    /// A sequence of items, e.g. a queryable source or a grouping.
    Sequence(Box<ValueType>),
    /// A value type that admits NULL.
    Nullable(Box<ValueType>),
}

impl ValueType {
    pub fn entity(name: impl Into<String>) -> Self {
        ValueType::Entity(name.into())
    }

    pub fn sequence(item: ValueType) -> Self {
        ValueType::Sequence(Box::new(item))
    }

    pub fn nullable(inner: ValueType) -> Self {
        match inner {
            already @ ValueType::Nullable(_) => already,
            other => ValueType::Nullable(Box::new(other)),
        }
    }

    /// The type with any `Nullable` wrapper removed.
    pub fn underlying(&self) -> &ValueType {
        match self {
            ValueType::Nullable(inner) => inner.underlying(),
            other => other,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.underlying(), ValueType::Boolean)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.underlying(), ValueType::String | ValueType::Char)
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.underlying(), ValueType::Entity(_))
    }

    /// Whether a column of this type may hold NULL.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            ValueType::Nullable(_)
                | ValueType::String
                | ValueType::Object
                | ValueType::Entity(_)
        )
    }

    /// Item type of a sequence, or `None` for scalar types.
    pub fn item_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::Sequence(item) => Some(item),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "Boolean"),
            ValueType::Byte => write!(f, "Byte"),
            ValueType::Int16 => write!(f, "Int16"),
            ValueType::Int32 => write!(f, "Int32"),
            ValueType::Int64 => write!(f, "Int64"),
            ValueType::Single => write!(f, "Single"),
            ValueType::Double => write!(f, "Double"),
            ValueType::Decimal => write!(f, "Decimal"),
            ValueType::Char => write!(f, "Char"),
            ValueType::String => write!(f, "String"),
            ValueType::DateTime => write!(f, "DateTime"),
            ValueType::DateOnly => write!(f, "DateOnly"),
            ValueType::TimeSpan => write!(f, "TimeSpan"),
            ValueType::Object => write!(f, "Object"),
            ValueType::Entity(name) => write!(f, "{}", name),
            ValueType::Sequence(item) => write!(f, "Sequence<{}>", item),
            ValueType::Nullable(inner) => write!(f, "Nullable<{}>", inner),
        }
    }
}

/// A literal value carried by constants and command parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Char(char),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Identity of a mapped domain object: its type and primary key value.
    Entity { type_name: String, id: Box<Value> },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Char(c) => write!(f, "'{}'", c),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Entity { type_name, id } => write!(f, "{}#{}", type_name, id),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_does_not_nest() {
        let ty = ValueType::nullable(ValueType::nullable(ValueType::Int32));
        assert_eq!(ty, ValueType::Nullable(Box::new(ValueType::Int32)));
        assert_eq!(ty.underlying(), &ValueType::Int32);
    }

    #[test]
    fn test_nullability() {
        assert!(ValueType::String.is_nullable());
        assert!(ValueType::nullable(ValueType::Int32).is_nullable());
        assert!(!ValueType::Int32.is_nullable());
        assert!(!ValueType::Boolean.is_nullable());
    }

    #[test]
    fn test_signature_names() {
        assert_eq!(ValueType::Int32.to_string(), "Int32");
        assert_eq!(ValueType::entity("Cook").to_string(), "Cook");
        assert_eq!(
            ValueType::sequence(ValueType::entity("Cook")).to_string(),
            "Sequence<Cook>"
        );
    }
}
