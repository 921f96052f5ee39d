//! WDL data types system
//!
//! WDL has atomic types such as `Int`, `Boolean`, and `String`, and parametric
//! types like `Array[String]` and `Map[String,Array[Array[Float]]]`. Each type
//! is represented by an immutable instance of a Rust enum.
//!
//! Optionality is a wrapping variant rather than a flag so that `T??`, which
//! the wire format cannot express, stays representable and can be rejected
//! explicitly by the serializer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The base type for all WDL types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// Boolean type (true/false)
    Boolean,

    /// Integer type
    Int,

    /// Floating point type
    Float,

    /// String type
    String,

    /// File type (a local path or a remote file handle)
    File,

    /// Array type, parameterized by item type
    Array { item_type: Box<Type>, nonempty: bool },

    /// Map type, parameterized by key and value types
    Map {
        key_type: Box<Type>,
        value_type: Box<Type>,
    },

    /// Pair type, parameterized by left and right types
    Pair {
        left_type: Box<Type>,
        right_type: Box<Type>,
    },

    /// `T?`
    Optional(Box<Type>),

    /// Instance of a struct type, with its members in declaration order
    Struct {
        type_name: String,
        members: IndexMap<String, Type>,
    },
}

impl Type {
    pub fn boolean() -> Self {
        Type::Boolean
    }

    pub fn int() -> Self {
        Type::Int
    }

    pub fn float() -> Self {
        Type::Float
    }

    pub fn string() -> Self {
        Type::String
    }

    pub fn file() -> Self {
        Type::File
    }

    pub fn array(item_type: Type) -> Self {
        Type::Array {
            item_type: Box::new(item_type),
            nonempty: false,
        }
    }

    /// `Array[T]+`
    pub fn nonempty_array(item_type: Type) -> Self {
        Type::Array {
            item_type: Box::new(item_type),
            nonempty: true,
        }
    }

    pub fn map(key_type: Type, value_type: Type) -> Self {
        Type::Map {
            key_type: Box::new(key_type),
            value_type: Box::new(value_type),
        }
    }

    pub fn pair(left_type: Type, right_type: Type) -> Self {
        Type::Pair {
            left_type: Box::new(left_type),
            right_type: Box::new(right_type),
        }
    }

    pub fn struct_type(type_name: impl Into<String>, members: IndexMap<String, Type>) -> Self {
        Type::Struct {
            type_name: type_name.into(),
            members,
        }
    }

    /// Wrap in `Optional` unless already optional.
    pub fn optional(self) -> Self {
        if self.is_optional() {
            self
        } else {
            Type::Optional(Box::new(self))
        }
    }

    /// Wrap in `Optional` unconditionally, which can produce `T??`.
    pub fn wrap_optional(self) -> Self {
        Type::Optional(Box::new(self))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Type::Optional(_))
    }

    /// `Optional(Optional(_))` at the outermost level.
    pub fn is_double_optional(&self) -> bool {
        matches!(self, Type::Optional(inner) if inner.is_optional())
    }

    /// Strip one level of optionality.
    pub fn strip_optional(&self) -> &Type {
        match self {
            Type::Optional(inner) => inner,
            other => other,
        }
    }

    /// Primitive types map one to one onto wire scalars.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Boolean | Type::Int | Type::Float | Type::String | Type::File
        )
    }

    /// `T??` at any depth, including inside containers and struct members.
    pub fn contains_double_optional(&self) -> bool {
        self.is_double_optional()
            || self
                .parameters()
                .iter()
                .any(|t| t.contains_double_optional())
    }

    /// Get the parameter types of this type.
    pub fn parameters(&self) -> Vec<&Type> {
        match self {
            Type::Array { item_type, .. } => vec![item_type],
            Type::Map {
                key_type,
                value_type,
            } => vec![key_type, value_type],
            Type::Pair {
                left_type,
                right_type,
            } => vec![left_type, right_type],
            Type::Optional(inner) => vec![inner],
            Type::Struct { members, .. } => members.values().collect(),
            _ => vec![],
        }
    }

    /// True when a `File` occurs anywhere inside this type.
    pub fn contains_file(&self) -> bool {
        matches!(self, Type::File) || self.parameters().iter().any(|t| t.contains_file())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "Boolean"),
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::String => write!(f, "String"),
            Type::File => write!(f, "File"),
            Type::Array {
                item_type,
                nonempty,
            } => write!(f, "Array[{}]{}", item_type, if *nonempty { "+" } else { "" }),
            Type::Map {
                key_type,
                value_type,
            } => write!(f, "Map[{},{}]", key_type, value_type),
            Type::Pair {
                left_type,
                right_type,
            } => write!(f, "Pair[{},{}]", left_type, right_type),
            Type::Optional(inner) => write!(f, "{}?", inner),
            Type::Struct { type_name, .. } => write!(f, "{}", type_name),
        }
    }
}
