//! Static analysis of expressions: the identifiers an expression reads, and
//! whether it is simple enough to be wired directly between stages.

use super::{Expression, StringPart};
use crate::error::SourcePosition;
use crate::types::Type;
use crate::value::Value;
use indexmap::IndexMap;

/// A variable read by an expression.
///
/// Member access on an untyped identifier (a call namespace, `add.result`) is
/// recorded as the dotted name with the type of the member. Member access on a
/// typed value (`p.left`) is recorded as a read of the value itself.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentRef {
    pub name: String,
    pub ty: Option<Type>,
    pub pos: SourcePosition,
}

impl IdentRef {
    /// The leading segment of a dotted name.
    pub fn base_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

impl Expression {
    /// Every identifier reference, in source order, duplicates included.
    pub fn references(&self) -> Vec<IdentRef> {
        let mut refs = Vec::new();
        collect_references(self, &mut refs);
        refs
    }

    /// Identifier references deduplicated by name, first occurrence wins.
    pub fn free_identifiers(&self) -> Vec<IdentRef> {
        let mut seen = indexmap::IndexSet::new();
        self.references()
            .into_iter()
            .filter(|r| seen.insert(r.name.clone()))
            .collect()
    }

    /// A literal, or a compound literal built only from literals.
    pub fn is_literal_constant(&self) -> bool {
        match self {
            Expression::Boolean { .. }
            | Expression::Int { .. }
            | Expression::Float { .. }
            | Expression::Null { .. } => true,
            Expression::String { parts, .. } => {
                parts.iter().all(|part| matches!(part, StringPart::Text(_)))
            }
            Expression::Array { .. }
            | Expression::Pair { .. }
            | Expression::Map { .. }
            | Expression::Struct { .. } => {
                self.children().iter().all(|child| child.is_literal_constant())
            }
            _ => false,
        }
    }

    /// A bare identifier, or a call output reference such as `add.result`.
    pub fn is_identifier(&self) -> bool {
        match self {
            Expression::Ident { .. } => true,
            Expression::Get { expr, .. } => matches!(
                expr.as_ref(),
                Expression::Ident {
                    inferred_type: None,
                    ..
                }
            ),
            _ => false,
        }
    }

    /// Trivial expressions need no evaluation: a constant or a bare identifier.
    pub fn is_trivial(&self) -> bool {
        self.is_identifier() || self.is_literal_constant()
    }

    /// The value of a literal constant, or `None` if evaluation needs a
    /// runtime environment.
    pub fn constant_value(&self) -> Option<Value> {
        match self {
            Expression::Boolean { value, .. } => Some(Value::boolean(*value)),
            Expression::Int { value, .. } => Some(Value::int(*value)),
            Expression::Float { value, .. } => Some(Value::float(*value)),
            Expression::Null { .. } => Some(Value::Null),
            Expression::String { parts, .. } => parts
                .iter()
                .map(|part| match part {
                    StringPart::Text(text) => Some(text.as_str()),
                    StringPart::Placeholder { .. } => None,
                })
                .collect::<Option<String>>()
                .map(Value::string),
            Expression::Array { items, .. } => items
                .iter()
                .map(Expression::constant_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::array),
            Expression::Pair { left, right, .. } => {
                Some(Value::pair(left.constant_value()?, right.constant_value()?))
            }
            Expression::Map { pairs, .. } => pairs
                .iter()
                .map(|(k, v)| Some((k.constant_value()?, v.constant_value()?)))
                .collect::<Option<Vec<_>>>()
                .map(Value::map),
            Expression::Struct {
                members,
                inferred_type,
                ..
            } => {
                let type_name = match inferred_type {
                    Some(Type::Struct { type_name, .. }) => type_name.clone(),
                    _ => "Object".to_string(),
                };
                let members = members
                    .iter()
                    .map(|(name, expr)| Some((name.clone(), expr.constant_value()?)))
                    .collect::<Option<IndexMap<_, _>>>()?;
                Some(Value::struct_value(type_name, members))
            }
            _ => None,
        }
    }
}

fn collect_references(expr: &Expression, refs: &mut Vec<IdentRef>) {
    match expr {
        Expression::Ident {
            pos,
            name,
            inferred_type,
        } => refs.push(IdentRef {
            name: name.clone(),
            ty: inferred_type.clone(),
            pos: pos.clone(),
        }),
        Expression::Get {
            pos,
            expr: inner,
            field,
            inferred_type,
        } => match inner.as_ref() {
            Expression::Ident {
                name,
                inferred_type: None,
                ..
            } => refs.push(IdentRef {
                name: format!("{}.{}", name, field),
                ty: inferred_type.clone(),
                pos: pos.clone(),
            }),
            _ => collect_references(inner, refs),
        },
        other => {
            for child in other.children() {
                collect_references(child, refs);
            }
        }
    }
}
