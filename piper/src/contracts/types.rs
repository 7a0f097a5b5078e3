//! Runtime type descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A declared parameter or result type.
///
/// Serializes as `{"type": "<name>", ...}`, the catalog format consumed by
/// metadata endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypeSpec {
    /// A JSON string.
    String,
    /// A whole number.
    Integer,
    /// Any number.
    Float,
    /// `true` or `false`.
    Boolean,
    /// Anything, including null.
    Any,
    /// Only null.
    None,
    /// A homogeneous sequence.
    Array {
        /// Element type.
        value_type: Box<TypeSpec>,
    },
    /// A mapping with uniformly typed keys and values.
    Dict {
        /// Key type; keys are checked as JSON strings.
        key_type: Box<TypeSpec>,
        /// Value type.
        value_type: Box<TypeSpec>,
    },
    /// A fixed-arity sequence.
    Tuple {
        /// Per-position types.
        value_type: Vec<TypeSpec>,
    },
    /// One of several alternatives.
    Union {
        /// The alternatives.
        value_type: Vec<TypeSpec>,
    },
    /// A record with named fields. Extra fields are allowed.
    Object {
        /// Field types.
        value_type: BTreeMap<String, TypeSpec>,
    },
}

impl TypeSpec {
    /// Creates an array type.
    #[must_use]
    pub fn array(item: TypeSpec) -> Self {
        Self::Array {
            value_type: Box::new(item),
        }
    }

    /// Creates a dict type.
    #[must_use]
    pub fn dict(key: TypeSpec, value: TypeSpec) -> Self {
        Self::Dict {
            key_type: Box::new(key),
            value_type: Box::new(value),
        }
    }

    /// Creates a tuple type.
    #[must_use]
    pub fn tuple(items: impl IntoIterator<Item = TypeSpec>) -> Self {
        Self::Tuple {
            value_type: items.into_iter().collect(),
        }
    }

    /// Creates a union type.
    #[must_use]
    pub fn union(options: impl IntoIterator<Item = TypeSpec>) -> Self {
        Self::Union {
            value_type: options.into_iter().collect(),
        }
    }

    /// Creates `union<inner, none>`.
    #[must_use]
    pub fn optional(inner: TypeSpec) -> Self {
        Self::union([inner, Self::None])
    }

    /// Creates an object type from `(field, type)` pairs.
    #[must_use]
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, TypeSpec)>) -> Self {
        Self::Object {
            value_type: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        }
    }

    /// Returns true if `value` conforms to this type.
    #[must_use]
    pub fn check(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _)
            | (Self::None, Value::Null)
            | (Self::String, Value::String(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Float, Value::Number(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Array { value_type }, Value::Array(items)) => {
                items.iter().all(|item| value_type.check(item))
            }
            (Self::Tuple { value_type }, Value::Array(items)) => {
                value_type.len() == items.len()
                    && value_type.iter().zip(items).all(|(t, item)| t.check(item))
            }
            (
                Self::Dict {
                    key_type,
                    value_type,
                },
                Value::Object(map),
            ) => map.iter().all(|(key, item)| {
                key_type.check(&Value::String(key.clone())) && value_type.check(item)
            }),
            (Self::Object { value_type }, Value::Object(map)) => value_type
                .iter()
                .all(|(field, t)| map.get(field).is_some_and(|item| t.check(item))),
            (Self::Union { value_type }, _) => value_type.iter().any(|t| t.check(value)),
            _ => false,
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: &[TypeSpec], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::Any => f.write_str("any"),
            Self::None => f.write_str("none"),
            Self::Array { value_type } => write!(f, "array<{value_type}>"),
            Self::Dict {
                key_type,
                value_type,
            } => write!(f, "dict<{key_type}, {value_type}>"),
            Self::Tuple { value_type } => {
                f.write_str("tuple<")?;
                join(f, value_type, ", ")?;
                f.write_str(">")
            }
            Self::Union { value_type } => {
                f.write_str("union<")?;
                join(f, value_type, " | ")?;
                f.write_str(">")
            }
            Self::Object { value_type } => {
                f.write_str("object{")?;
                for (i, (field, t)) in value_type.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}: {t}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert!(TypeSpec::Integer.check(&json!(3)));
        assert!(TypeSpec::Integer.check(&json!(-3)));
        assert!(!TypeSpec::Integer.check(&json!(3.5)));
        assert!(TypeSpec::Float.check(&json!(3)));
        assert!(TypeSpec::Float.check(&json!(3.5)));
        assert!(!TypeSpec::String.check(&json!(1)));
        assert!(TypeSpec::None.check(&json!(null)));
        assert!(TypeSpec::Any.check(&json!({"x": [1]})));
    }

    #[test]
    fn test_containers() {
        let ints = TypeSpec::array(TypeSpec::Integer);
        assert!(ints.check(&json!([1, 2, 3])));
        assert!(ints.check(&json!([])));
        assert!(!ints.check(&json!([1, "two"])));

        let pair = TypeSpec::tuple([TypeSpec::String, TypeSpec::Any]);
        assert!(pair.check(&json!(["a.*", {"output": "input"}])));
        assert!(!pair.check(&json!(["a.*"])));

        let scores = TypeSpec::dict(TypeSpec::String, TypeSpec::Float);
        assert!(scores.check(&json!({"a": 1.5, "b": 2})));
        assert!(!scores.check(&json!({"a": "high"})));
    }

    #[test]
    fn test_object_allows_extra_fields() {
        let person = TypeSpec::object([("name", TypeSpec::String)]);
        assert!(person.check(&json!({"name": "ada", "age": 36})));
        assert!(!person.check(&json!({"age": 36})));
    }

    #[test]
    fn test_optional() {
        let maybe = TypeSpec::optional(TypeSpec::String);
        assert!(maybe.check(&json!(null)));
        assert!(maybe.check(&json!("x")));
        assert!(!maybe.check(&json!(1)));
    }

    #[test]
    fn test_serialized_form() {
        let spec = TypeSpec::dict(TypeSpec::String, TypeSpec::array(TypeSpec::Integer));
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "type": "dict",
                "key_type": {"type": "string"},
                "value_type": {"type": "array", "value_type": {"type": "integer"}}
            })
        );

        let parsed: TypeSpec =
            serde_json::from_value(json!({"type": "union", "value_type": [{"type": "none"}]}))
                .unwrap();
        assert_eq!(parsed, TypeSpec::union([TypeSpec::None]));
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeSpec::array(TypeSpec::Any).to_string(), "array<any>");
        assert_eq!(
            TypeSpec::optional(TypeSpec::Integer).to_string(),
            "union<integer | none>"
        );
        assert_eq!(
            TypeSpec::object([("a", TypeSpec::Boolean)]).to_string(),
            "object{a: boolean}"
        );
    }
}
