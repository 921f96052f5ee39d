//! WDL values exchanged between compiled stages
//!
//! Each value is represented by a Rust enum corresponding to the WDL value
//! types. Values do not carry their type; the declared type travels alongside
//! (see [`crate::links::WdlVarLinks`]) and drives serialization.

use crate::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// WDL runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent optional (None in WDL)
    Null,

    Boolean(bool),

    Int(i64),

    Float(f64),

    String(String),

    /// Local path, or a `dx://` URI naming a remote file
    File(String),

    /// Present optional
    Optional(Box<Value>),

    Array(Vec<Value>),

    /// Key-value pairs in insertion order; keys need not be strings
    Map(Vec<(Value, Value)>),

    Pair { left: Box<Value>, right: Box<Value> },

    Struct {
        type_name: String,
        members: IndexMap<String, Value>,
    },
}

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn int(value: i64) -> Self {
        Value::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn file(value: impl Into<String>) -> Self {
        Value::File(value.into())
    }

    pub fn some(value: Value) -> Self {
        Value::Optional(Box::new(value))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(values)
    }

    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        Value::Map(pairs)
    }

    pub fn pair(left: Value, right: Value) -> Self {
        Value::Pair {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn struct_value(type_name: impl Into<String>, members: IndexMap<String, Value>) -> Self {
        Value::Struct {
            type_name: type_name.into(),
            members,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `Optional(Optional(_))` or `Optional(Null)`, both meaning "some none".
    pub fn is_double_optional(&self) -> bool {
        matches!(self, Value::Optional(inner) if matches!(**inner, Value::Optional(_) | Value::Null))
    }

    /// Rewrite a plain value (such as an evaluated literal) into the form
    /// `wdl_type` expects: present optionals wrapped in `Optional`, and absent
    /// optional struct members filled with `Null`. Shapes that do not match
    /// `wdl_type` are left as they are.
    pub fn coerce_optionals(&self, wdl_type: &Type) -> Value {
        match (wdl_type, self) {
            (Type::Optional(_), Value::Null) => Value::Null,
            (Type::Optional(inner), Value::Optional(value)) => {
                Value::some(value.coerce_optionals(inner))
            }
            (Type::Optional(inner), value) => Value::some(value.coerce_optionals(inner)),
            (Type::Array { item_type, .. }, Value::Array(items)) => Value::array(
                items
                    .iter()
                    .map(|item| item.coerce_optionals(item_type))
                    .collect(),
            ),
            (
                Type::Map {
                    key_type,
                    value_type,
                },
                Value::Map(pairs),
            ) => Value::map(
                pairs
                    .iter()
                    .map(|(k, v)| (k.coerce_optionals(key_type), v.coerce_optionals(value_type)))
                    .collect(),
            ),
            (
                Type::Pair {
                    left_type,
                    right_type,
                },
                Value::Pair { left, right },
            ) => Value::pair(
                left.coerce_optionals(left_type),
                right.coerce_optionals(right_type),
            ),
            (
                Type::Struct {
                    members: types, ..
                },
                Value::Struct { type_name, members },
            ) => {
                let mut coerced: IndexMap<String, Value> = members
                    .iter()
                    .map(|(name, member)| {
                        let member = match types.get(name) {
                            Some(member_type) => member.coerce_optionals(member_type),
                            None => member.clone(),
                        };
                        (name.clone(), member)
                    })
                    .collect();
                for (name, member_type) in types {
                    if member_type.is_optional() && !coerced.contains_key(name) {
                        coerced.insert(name.clone(), Value::Null);
                    }
                }
                Value::struct_value(type_name.clone(), coerced)
            }
            (_, value) => value.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(value) | Value::File(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Get all child values (for compound types)
    pub fn children(&self) -> Vec<&Value> {
        match self {
            Value::Optional(inner) => vec![inner],
            Value::Array(values) => values.iter().collect(),
            Value::Map(pairs) => pairs.iter().flat_map(|(k, v)| [k, v]).collect(),
            Value::Pair { left, right } => vec![left, right],
            Value::Struct { members, .. } => members.values().collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::String(value) | Value::File(value) => write!(f, "{:?}", value),
            Value::Optional(inner) => write!(f, "Some({})", inner),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, item) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Pair { left, right } => write!(f, "({}, {})", left, right),
            Value::Struct { type_name, members } => {
                write!(f, "{} {{", type_name)?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
