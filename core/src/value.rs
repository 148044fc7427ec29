//! Value types, runtime values, and conversion hooks.
//!
//! Every parameter declares a [`ValueType`] describing the shape its raw
//! string tokens convert into. Conversion produces a [`Value`], either via
//! the parameter's own [`Converter`] or via [`convert`], the type-appropriate
//! default conversion.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The shape a parameter's raw values convert into.
///
/// # Examples
///
/// ```
/// use command_model_core::ValueType;
///
/// let tags = ValueType::List(Box::new(ValueType::String));
/// assert!(tags.is_vector());
///
/// let env = ValueType::Map(Box::new(ValueType::String), Box::new(ValueType::Integer));
/// assert!(env.is_pair_deconstructable());
///
/// let level = ValueType::FlagValue(Box::new(ValueType::Integer));
/// assert!(level.is_flag_value());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// `true` or `false`.
    Bool,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Any string (the default).
    #[default]
    String,
    /// Several values of the inner type.
    List(Box<ValueType>),
    /// Key/value pairs, each split from a single raw token.
    Map(Box<ValueType>, Box<ValueType>),
    /// A value that can be present without a value of the inner type.
    FlagValue(Box<ValueType>),
}

impl ValueType {
    /// Returns `true` if raw values of this type are split into key/value pairs.
    pub fn is_pair_deconstructable(&self) -> bool {
        matches!(self, Self::Map(..))
    }

    /// Returns `true` if this type can represent "present with no value".
    pub fn is_flag_value(&self) -> bool {
        match self {
            Self::FlagValue(_) => true,
            Self::List(inner) => matches!(inner.as_ref(), Self::FlagValue(_)),
            _ => false,
        }
    }

    /// Returns `true` if this type binds multiple raw values.
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(..))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Self::FlagValue(inner) => write!(f, "flag<{inner}>"),
        }
    }
}

/// A converted parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    FlagValue {
        is_set: bool,
        value: Option<Box<Value>>,
    },
}

impl Value {
    /// Returns the boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list payload, if any.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The value an absent flag-value parameter takes.
    pub fn unset_flag() -> Self {
        Self::FlagValue {
            is_set: false,
            value: None,
        }
    }
}

/// A custom string-to-value conversion attached to a parameter.
///
/// # Examples
///
/// ```
/// use command_model_core::{Converter, Value};
///
/// let upper = Converter::new(|raw| Ok(Value::String(raw.to_uppercase())));
/// assert_eq!(upper.convert("dog").unwrap(), Value::String("DOG".into()));
/// ```
#[derive(Clone)]
pub struct Converter(Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>);

impl Converter {
    pub fn new(f: impl Fn(&str) -> Result<Value, String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        (self.0)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Converter(..)")
    }
}

/// Splits a single raw token into a key and a value.
#[derive(Clone)]
pub struct PairDeconstructor(Arc<dyn Fn(&str) -> Result<(String, String), String> + Send + Sync>);

impl PairDeconstructor {
    pub fn new(
        f: impl Fn(&str) -> Result<(String, String), String> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub fn deconstruct(&self, raw: &str) -> Result<(String, String), String> {
        (self.0)(raw)
    }
}

impl fmt::Debug for PairDeconstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PairDeconstructor(..)")
    }
}

/// Splits `key=value` on the first `=`.
///
/// Used for pair-deconstructable options that do not declare their own
/// [`PairDeconstructor`].
///
/// # Examples
///
/// ```
/// use command_model_core::split_key_value;
///
/// assert_eq!(split_key_value("a=b=c").unwrap(), ("a".into(), "b=c".into()));
/// assert!(split_key_value("novalue").is_err());
/// ```
pub fn split_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        Some(_) => Err("the key cannot be empty".to_string()),
        None => Err("expected a value in the form KEY=VALUE".to_string()),
    }
}

/// Converts a raw token using the default conversion for `value_type`.
///
/// Vector and flag-value types convert a single raw token to their element
/// type. Pair types cannot be converted from a single token.
///
/// # Examples
///
/// ```
/// use command_model_core::{convert, Value, ValueType};
///
/// assert_eq!(convert(&ValueType::Integer, "4").unwrap(), Value::Integer(4));
/// assert_eq!(convert(&ValueType::Bool, "TRUE").unwrap(), Value::Bool(true));
/// assert!(convert(&ValueType::Integer, "four").is_err());
/// ```
pub fn convert(value_type: &ValueType, raw: &str) -> Result<Value, String> {
    match value_type {
        ValueType::Bool => {
            if raw.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if raw.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(format!("'{raw}' is not a valid boolean"))
            }
        }
        ValueType::Integer => raw
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|err| err.to_string()),
        ValueType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|err| err.to_string()),
        ValueType::String => Ok(Value::String(raw.to_string())),
        ValueType::List(inner) | ValueType::FlagValue(inner) => convert(inner, raw),
        ValueType::Map(..) => Err("a pair value cannot be converted from a single token".to_string()),
    }
}
