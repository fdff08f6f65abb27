//! Data row values and conversion into test parameters
//!
//! Provides the literal value type carried by data rows plus the conversion
//! traits used to bind those literals to a test body's typed parameters:
//! - `Value` - the literal itself
//! - `FromValue` - convert a `Value` into a Rust parameter type
//!
//! # Examples
//!
//! ```
//! use minitest::{FromValue, Value};
//!
//! let value: Value = 42.into();
//! let n: i32 = FromValue::from_value(&value).unwrap();
//! assert_eq!(n, 42);
//!
//! // Integers widen to floats, nothing else is coerced
//! let f: f64 = FromValue::from_value(&value).unwrap();
//! assert_eq!(f, 42.0);
//! assert!(String::from_value(&value).is_err());
//! ```

use std::fmt;
use thiserror::Error;

/// A literal argument inside a data row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Name of the value's kind, used in conversion errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Error type for value conversion failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The value's kind does not match the parameter type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// An integer literal does not fit the parameter type
    #[error("integer {value} is out of range for {target}")]
    OutOfRange { value: i64, target: &'static str },
}

/// Trait for converting a data row `Value` into a test parameter
pub trait FromValue: Sized {
    /// Convert from `Value` to the parameter type
    ///
    /// # Errors
    ///
    /// Returns `ConversionError` if the value cannot represent the target type.
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

fn mismatch(expected: &'static str, value: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: value.type_name(),
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(n) => Ok(*n),
            _ => Err(mismatch("integer", value)),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let n = i64::from_value(value)?;
                    <$ty>::try_from(n).map_err(|_| ConversionError::OutOfRange {
                        value: n,
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

narrow_int!(i8, i16, i32, u8, u16, u32, u64, usize, isize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(x) => Ok(*x),
            Value::Int(n) => Ok(*n as f64),
            _ => Err(mismatch("float", value)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|x| x as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            _ => Err(mismatch("string", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(value)?)),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_int_narrowing_in_range() {
        let v = Value::Int(200);
        assert_eq!(u8::from_value(&v).unwrap(), 200);
        assert_eq!(i32::from_value(&v).unwrap(), 200);
    }

    #[test]
    fn test_int_narrowing_out_of_range() {
        let err = i8::from_value(&Value::Int(300)).unwrap_err();
        assert_eq!(
            err,
            ConversionError::OutOfRange {
                value: 300,
                target: "i8"
            }
        );
        assert_eq!(err.to_string(), "integer 300 is out of range for i8");
    }

    #[test]
    fn test_float_accepts_int() {
        assert_eq!(f64::from_value(&Value::Int(3)).unwrap(), 3.0);
        assert_eq!(f64::from_value(&Value::Float(2.5)).unwrap(), 2.5);
    }

    #[rstest]
    #[case(Value::Str("x".into()), "integer", "string")]
    #[case(Value::Bool(true), "integer", "bool")]
    #[case(Value::Float(1.5), "integer", "float")]
    #[case(Value::Null, "integer", "null")]
    fn test_no_coercion_into_int(
        #[case] value: Value,
        #[case] expected: &'static str,
        #[case] found: &'static str,
    ) {
        assert_eq!(
            i64::from_value(&value).unwrap_err(),
            ConversionError::TypeMismatch { expected, found }
        );
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<i64>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(&Value::Int(1)).unwrap(), Some(1));
        assert!(Option::<i64>::from_value(&Value::Bool(false)).is_err());
    }

    #[test]
    fn test_into_value() {
        assert_eq!(Value::from(5), Value::Int(5));
        assert_eq!(Value::from("a"), Value::Str("a".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Str("hi".into()).to_string(), "\"hi\"");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
