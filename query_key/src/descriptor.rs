//! Query descriptors
//!
//! A descriptor is the logical identity of a query before it is turned into a
//! cache key: the resource it reads and the parameters it was called with.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::codec::{derive_key, QueryKey};
use crate::errors::KeyError;
use crate::types::ParamValue;

/// Logical identity of a query (resource name + parameters)
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    resource_name: String,
    params: BTreeMap<String, ParamValue>,
}

impl QueryDescriptor {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter. A later value for the same name replaces the earlier one.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Build a descriptor from a JSON object of primitive values.
    ///
    /// Nested arrays or objects cannot be canonicalized and are rejected here,
    /// before a key is ever derived from them.
    pub fn from_json(resource_name: impl Into<String>, params: &Value) -> Result<Self, KeyError> {
        let object = match params {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::new(resource_name)),
            Value::Array(_) => return Err(KeyError::ParamsNotObject("an array")),
            Value::String(_) => return Err(KeyError::ParamsNotObject("a string")),
            Value::Number(_) => return Err(KeyError::ParamsNotObject("a number")),
            Value::Bool(_) => return Err(KeyError::ParamsNotObject("a boolean")),
        };

        let mut descriptor = Self::new(resource_name);
        for (name, value) in object {
            let value = match value {
                Value::Null => ParamValue::Null,
                Value::Bool(b) => ParamValue::Boolean(*b),
                Value::String(s) => ParamValue::Text(s.clone()),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => ParamValue::Integer(i),
                    None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                Value::Array(_) => {
                    return Err(KeyError::NonPrimitive {
                        param: name.clone(),
                        kind: "array",
                    })
                }
                Value::Object(_) => {
                    return Err(KeyError::NonPrimitive {
                        param: name.clone(),
                        kind: "object",
                    })
                }
            };
            descriptor.params.insert(name.clone(), value);
        }
        Ok(descriptor)
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Derive the canonical cache key for this descriptor
    pub fn key(&self) -> Result<QueryKey, KeyError> {
        derive_key(self)
    }
}
