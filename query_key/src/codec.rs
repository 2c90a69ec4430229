//! Canonical key derivation
//!
//! Keys are built from a sorted parameter map so insertion order never
//! matters. Every spelling of "no filter" (null, empty text, `all`) is
//! dropped from the key, which makes an omitted filter and an explicitly
//! cleared one collide.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Number, Value};

use crate::descriptor::QueryDescriptor;
use crate::errors::KeyError;
use crate::types::ParamValue;

/// Parameters that are always normalized to integers
pub const INTEGRAL_PARAMS: &[&str] = &["page", "limit", "page_size", "per_page", "offset"];

/// Canonical cache key for a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: String,
    params: String,
}

impl QueryKey {
    /// Resource name the key was derived from
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Canonical JSON rendering of the parameters
    pub fn params(&self) -> &str {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.params)
    }
}

pub fn is_integral_param(name: &str) -> bool {
    INTEGRAL_PARAMS.contains(&name)
}

/// Derive the canonical key for a descriptor
pub fn derive_key(descriptor: &QueryDescriptor) -> Result<QueryKey, KeyError> {
    let resource = descriptor.resource_name().trim();
    if resource.is_empty() {
        return Err(KeyError::EmptyResourceName);
    }

    let mut canonical: BTreeMap<&str, Value> = BTreeMap::new();
    for (name, value) in descriptor.params() {
        if name.trim().is_empty() {
            return Err(KeyError::EmptyParamName(resource.to_string()));
        }
        if let Some(value) = canonical_value(name, value)? {
            canonical.insert(name.as_str(), value);
        }
    }

    // A BTreeMap of JSON values always serializes; the fallback is unreachable.
    let params = serde_json::to_string(&canonical).unwrap_or_else(|_| "{}".to_string());

    Ok(QueryKey {
        resource: resource.to_string(),
        params,
    })
}

fn is_unset_text(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case("all")
}

fn canonical_value(name: &str, value: &ParamValue) -> Result<Option<Value>, KeyError> {
    let integral = is_integral_param(name);

    match value {
        ParamValue::Null => Ok(None),
        ParamValue::Text(text) if is_unset_text(text) => Ok(None),
        ParamValue::Text(text) if integral => parse_integral(name, text).map(Some),
        ParamValue::Text(text) => Ok(Some(Value::String(text.clone()))),
        ParamValue::Integer(i) => Ok(Some(Value::from(*i))),
        ParamValue::Boolean(b) => Ok(Some(Value::Bool(*b))),
        ParamValue::Float(f) => {
            if !f.is_finite() {
                return Err(KeyError::NonFinite {
                    param: name.to_string(),
                });
            }
            if let Some(i) = float_as_integer(*f) {
                return Ok(Some(Value::from(i)));
            }
            if integral {
                return Err(KeyError::NonIntegral {
                    param: name.to_string(),
                    value: f.to_string(),
                });
            }
            Number::from_f64(*f)
                .map(|n| Some(Value::Number(n)))
                .ok_or_else(|| KeyError::NonFinite {
                    param: name.to_string(),
                })
        }
    }
}

fn float_as_integer(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_integral(name: &str, text: &str) -> Result<Value, KeyError> {
    let trimmed = text.trim();
    let parsed = trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(float_as_integer)
    });

    parsed.map(Value::from).ok_or_else(|| KeyError::NonIntegral {
        param: name.to_string(),
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn students() -> QueryDescriptor {
        QueryDescriptor::new("students")
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = QueryDescriptor::from_json(
            "students",
            &json!({"page": 1, "limit": 10, "search": "ana", "status": "active"}),
        )
        .unwrap();
        let b = students()
            .with_param("status", "active")
            .with_param("search", "ana")
            .with_param("limit", 10)
            .with_param("page", 1);

        assert_eq!(derive_key(&a).unwrap(), derive_key(&b).unwrap());
    }

    #[test]
    fn test_no_filter_spellings_collide() {
        let omitted = students().with_param("page", 1);
        let variants = [
            students().with_param("page", 1).with_param("status", ParamValue::Null),
            students().with_param("page", 1).with_param("status", ""),
            students().with_param("page", 1).with_param("status", "all"),
            students().with_param("page", 1).with_param("status", "ALL"),
            students().with_param("page", 1).with_param("status", "   "),
        ];

        let expected = derive_key(&omitted).unwrap();
        for variant in &variants {
            assert_eq!(derive_key(variant).unwrap(), expected);
        }
    }

    #[test]
    fn test_numeric_pagination_is_normalized() {
        let number = students().with_param("page", 2).with_param("limit", 10);
        let text = students().with_param("page", "2").with_param("limit", " 10 ");
        let float = students().with_param("page", 2.0).with_param("limit", "10.0");

        let key = derive_key(&number).unwrap();
        assert_eq!(derive_key(&text).unwrap(), key);
        assert_eq!(derive_key(&float).unwrap(), key);
        assert_eq!(key.params(), r#"{"limit":10,"page":2}"#);
    }

    #[test]
    fn test_single_filter_change_changes_key() {
        let base = students().with_param("page", 1).with_param("search", "");
        let next_page = students().with_param("page", 2).with_param("search", "");
        let searched = students().with_param("page", 1).with_param("search", "ana");
        let filtered = students()
            .with_param("page", 1)
            .with_param("status", "inactive");
        let other_resource = QueryDescriptor::new("teachers").with_param("page", 1);

        let key = derive_key(&base).unwrap();
        for other in [&next_page, &searched, &filtered, &other_resource] {
            assert_ne!(derive_key(other).unwrap(), key);
        }
    }

    #[test]
    fn test_text_is_not_coerced_outside_pagination() {
        let text = students().with_param("grade", "2");
        let number = students().with_param("grade", 2);
        assert_ne!(derive_key(&text).unwrap(), derive_key(&number).unwrap());
    }

    #[test]
    fn test_misuse_fails_fast() {
        assert_eq!(
            derive_key(&QueryDescriptor::new("  ")).unwrap_err(),
            KeyError::EmptyResourceName
        );
        assert!(matches!(
            derive_key(&students().with_param("page", "two")),
            Err(KeyError::NonIntegral { .. })
        ));
        assert!(matches!(
            derive_key(&students().with_param("page", 1.5)),
            Err(KeyError::NonIntegral { .. })
        ));
        assert!(matches!(
            derive_key(&students().with_param("ratio", f64::NAN)),
            Err(KeyError::NonFinite { .. })
        ));
        assert!(matches!(
            derive_key(&students().with_param("", 1)),
            Err(KeyError::EmptyParamName(_))
        ));
    }

    #[test]
    fn test_display_includes_resource() {
        let key = derive_key(&students().with_param("page", 1)).unwrap();
        assert_eq!(key.to_string(), r#"students:{"page":1}"#);
        assert_eq!(key.resource(), "students");
    }
}
