//! Literal and identifier expression constructors

use super::{Expression, StringPart};
use crate::error::SourcePosition;
use crate::types::Type;

impl Expression {
    /// Create a new Boolean expression
    pub fn boolean(pos: SourcePosition, value: bool) -> Self {
        Expression::Boolean {
            pos,
            value,
            inferred_type: Some(Type::boolean()),
        }
    }

    /// Create a new Int expression
    pub fn int(pos: SourcePosition, value: i64) -> Self {
        Expression::Int {
            pos,
            value,
            inferred_type: Some(Type::int()),
        }
    }

    /// Create a new Float expression
    pub fn float(pos: SourcePosition, value: f64) -> Self {
        Expression::Float {
            pos,
            value,
            inferred_type: Some(Type::float()),
        }
    }

    /// Create a new String expression
    pub fn string(pos: SourcePosition, parts: Vec<StringPart>) -> Self {
        Expression::String {
            pos,
            parts,
            inferred_type: Some(Type::string()),
        }
    }

    /// Create a new simple string literal
    pub fn string_literal(pos: SourcePosition, value: impl Into<String>) -> Self {
        Self::string(pos, vec![StringPart::Text(value.into())])
    }

    /// Create a new Null expression
    pub fn null(pos: SourcePosition) -> Self {
        Expression::Null {
            pos,
            inferred_type: None,
        }
    }

    /// Create a new Ident expression with no type attached
    pub fn ident(pos: SourcePosition, name: impl Into<String>) -> Self {
        Expression::Ident {
            pos,
            name: name.into(),
            inferred_type: None,
        }
    }

    /// Create a new Ident expression carrying its checked type
    pub fn typed_ident(pos: SourcePosition, name: impl Into<String>, ty: Type) -> Self {
        Expression::Ident {
            pos,
            name: name.into(),
            inferred_type: Some(ty),
        }
    }
}
