//! Parameter value types
//!
//! This module defines the primitive values a query parameter can hold
//! and the conversions from common Rust types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primitive value of a single query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Null,
}

impl ParamValue {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Integer(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "text",
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<String> for ParamValue {
    fn from(val: String) -> Self {
        ParamValue::Text(val)
    }
}

impl From<&str> for ParamValue {
    fn from(val: &str) -> Self {
        ParamValue::Text(val.to_string())
    }
}

impl From<&String> for ParamValue {
    fn from(val: &String) -> Self {
        ParamValue::Text(val.clone())
    }
}

impl From<i32> for ParamValue {
    fn from(val: i32) -> Self {
        ParamValue::Integer(val as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(val: i64) -> Self {
        ParamValue::Integer(val)
    }
}

impl From<u32> for ParamValue {
    fn from(val: u32) -> Self {
        ParamValue::Integer(val as i64)
    }
}

impl From<u64> for ParamValue {
    fn from(val: u64) -> Self {
        i64::try_from(val)
            .map(ParamValue::Integer)
            .unwrap_or(ParamValue::Float(val as f64))
    }
}

impl From<usize> for ParamValue {
    fn from(val: usize) -> Self {
        ParamValue::from(val as u64)
    }
}

impl From<f64> for ParamValue {
    fn from(val: f64) -> Self {
        ParamValue::Float(val)
    }
}

impl From<bool> for ParamValue {
    fn from(val: bool) -> Self {
        ParamValue::Boolean(val)
    }
}

impl From<Uuid> for ParamValue {
    fn from(val: Uuid) -> Self {
        ParamValue::Text(val.to_string())
    }
}

impl<T> From<Option<T>> for ParamValue
where
    T: Into<ParamValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => ParamValue::Null,
        }
    }
}
