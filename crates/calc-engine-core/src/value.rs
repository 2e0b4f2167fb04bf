//! Runtime value types

use crate::error::{Error, Result};
use crate::object::DataObject;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// A value carried by literals and produced by evaluation
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value (null)
    #[default]
    Empty,

    /// Floating point number
    Number(f64),

    /// Fixed-precision decimal
    Decimal(Decimal),

    /// Text value
    String(String),

    /// Boolean value
    Boolean(bool),

    /// Date and time (no time zone)
    DateTime(NaiveDateTime),

    /// Ordered sequence of values
    Array(Vec<Value>),

    /// Reference to a host-owned object
    Object(Arc<dyn DataObject>),
}

/// The variant of a [`Value`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Empty,
    Number,
    Decimal,
    String,
    Boolean,
    DateTime,
    Array,
    Object,
}

impl ValueKind {
    /// Name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Empty => "empty",
            ValueKind::Number => "number",
            ValueKind::Decimal => "decimal",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::DateTime => "datetime",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Wrap a host object
    pub fn object<T: DataObject + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Build an array from anything convertible to values
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Empty => ValueKind::Empty,
            Value::Number(_) => ValueKind::Number,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Check if the value is absent
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Check if the value is a number or a decimal
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Number(_) | Value::Decimal(_))
    }

    /// Convert to number, if possible
    ///
    /// Absent values count as zero, booleans as 1/0 and text is parsed with the
    /// invariant culture.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            Value::Boolean(true) => Some(1.0),
            Value::Boolean(false) => Some(0.0),
            Value::String(s) => s.trim().parse().ok(),
            Value::Empty => Some(0.0),
            _ => None,
        }
    }

    /// Convert to a fixed-precision decimal, if possible
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Number(n) => Decimal::from_f64(*n),
            Value::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
            Value::String(s) => s.trim().parse().ok(),
            Value::Empty => Some(Decimal::ZERO),
            _ => None,
        }
    }

    /// Convert to boolean, if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::Decimal(d) => Some(!d.is_zero()),
            Value::String(s) => {
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            Value::Empty => Some(false),
            _ => None,
        }
    }

    /// Convert to text
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Borrow the items of an array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the host object behind an object value
    pub fn as_object(&self) -> Option<&Arc<dyn DataObject>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Convert to a typed Rust value
    pub fn convert<T: FromValue>(&self) -> Result<T> {
        T::from_value(self).ok_or(Error::InvalidValueType {
            expected: T::TYPE_NAME,
            actual: self.type_name(),
        })
    }

    /// Coerce the value to another kind (used for indexer keys)
    pub fn coerce_to(&self, kind: ValueKind) -> Result<Value> {
        if self.kind() == kind {
            return Ok(self.clone());
        }
        let mismatch = || Error::InvalidValueType {
            expected: kind.name(),
            actual: self.type_name(),
        };
        match kind {
            ValueKind::Number => match self {
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(Value::Number)
                    .map_err(|_| Error::InvalidNumber(s.clone())),
                _ => self.as_number().map(Value::Number).ok_or_else(mismatch),
            },
            ValueKind::Decimal => match self {
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(Value::Decimal)
                    .map_err(|_| Error::InvalidNumber(s.clone())),
                _ => self.as_decimal().map(Value::Decimal).ok_or_else(mismatch),
            },
            ValueKind::String => Ok(Value::String(self.as_string())),
            ValueKind::Boolean => self.as_bool().map(Value::Boolean).ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }
}

/// Format a float without a trailing `.0` for whole numbers
fn format_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => format_number(f, *n),
            Value::Decimal(d) => write!(f, "{}", d.normalize()),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(o) => f.write_str(&o.describe()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str("Empty"),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Decimal(d) => f.debug_tuple("Decimal").field(d).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::DateTime(dt) => f.debug_tuple("DateTime").field(dt).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(o) => f.debug_tuple("Object").field(&o.type_name()).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
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

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::DateTime(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<Arc<dyn DataObject>> for Value {
    fn from(o: Arc<dyn DataObject>) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Empty, Into::into)
    }
}

/// Conversion from a runtime value into a Rust type
///
/// An absent value converts to the target's zero value, matching how typed
/// evaluation treats a null result.
pub trait FromValue: Sized {
    /// Name of the target type for error messages
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_number()
    }
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_number()
            .filter(|n| n.is_finite())
            .map(|n| n.round() as i64)
    }
}

impl FromValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|n| i32::try_from(n).ok())
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) | Value::Object(_) => None,
            other => Some(other.as_string()),
        }
    }
}

impl FromValue for Decimal {
    const TYPE_NAME: &'static str = "Decimal";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_decimal()
    }
}

impl FromValue for NaiveDateTime {
    const TYPE_NAME: &'static str = "NaiveDateTime";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(*dt),
            Value::Empty => Some(NaiveDateTime::default()),
            _ => None,
        }
    }
}

impl FromValue for Vec<Value> {
    const TYPE_NAME: &'static str = "Vec<Value>";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.clone()),
            Value::Empty => Some(Vec::new()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Empty => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
