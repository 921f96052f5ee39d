//! WDL expressions composing literal values, arithmetic, comparison, conditionals,
//! string interpolation, arrays & maps, and function applications.
//!
//! Expressions arrive already type-checked: identifiers carry the type the
//! checker inferred for them, which the closure engine reads back when it
//! reports the free variables of a block.

use crate::error::{HasSourcePosition, SourcePosition};
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod analysis;
pub mod control_flow;
pub mod literals;

pub use analysis::IdentRef;

/// WDL expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Boolean literal (true/false)
    Boolean {
        pos: SourcePosition,
        value: bool,
        inferred_type: Option<Type>,
    },

    /// Integer literal
    Int {
        pos: SourcePosition,
        value: i64,
        inferred_type: Option<Type>,
    },

    /// Float literal
    Float {
        pos: SourcePosition,
        value: f64,
        inferred_type: Option<Type>,
    },

    /// String literal (may contain placeholders)
    String {
        pos: SourcePosition,
        parts: Vec<StringPart>,
        inferred_type: Option<Type>,
    },

    /// Null literal (None in WDL)
    Null {
        pos: SourcePosition,
        inferred_type: Option<Type>,
    },

    /// Array literal [item1, item2, ...]
    Array {
        pos: SourcePosition,
        items: Vec<Expression>,
        inferred_type: Option<Type>,
    },

    /// Pair literal (left, right)
    Pair {
        pos: SourcePosition,
        left: Box<Expression>,
        right: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// Map literal {key1: value1, key2: value2, ...}
    Map {
        pos: SourcePosition,
        pairs: Vec<(Expression, Expression)>,
        inferred_type: Option<Type>,
    },

    /// Struct literal {member1: value1, member2: value2, ...}
    Struct {
        pos: SourcePosition,
        members: Vec<(String, Expression)>,
        inferred_type: Option<Type>,
    },

    /// Variable identifier reference
    Ident {
        pos: SourcePosition,
        name: String,
        inferred_type: Option<Type>,
    },

    /// Array/map subscript: expr[index]
    At {
        pos: SourcePosition,
        expr: Box<Expression>,
        index: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// Member access: expr.field
    Get {
        pos: SourcePosition,
        expr: Box<Expression>,
        field: String,
        inferred_type: Option<Type>,
    },

    /// Conditional expression: if condition then true_expr else false_expr
    IfThenElse {
        pos: SourcePosition,
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// Function application: function_name(arg1, arg2, ...)
    Apply {
        pos: SourcePosition,
        function_name: String,
        arguments: Vec<Expression>,
        inferred_type: Option<Type>,
    },

    /// Binary operations: +, -, *, /, %, ==, !=, <, <=, >, >=, &&, ||
    BinaryOp {
        pos: SourcePosition,
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        inferred_type: Option<Type>,
    },

    /// Unary operations: !, -
    UnaryOp {
        pos: SourcePosition,
        op: UnaryOperator,
        operand: Box<Expression>,
        inferred_type: Option<Type>,
    },
}

/// Parts of a string literal (literal text or placeholder)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringPart {
    /// Literal text
    Text(String),
    /// Expression placeholder ~{expr}
    Placeholder {
        expr: Box<Expression>,
        options: HashMap<String, String>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical NOT (!)
    Not,
    /// Numeric negation (-)
    Negate,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

impl HasSourcePosition for Expression {
    fn source_position(&self) -> &SourcePosition {
        match self {
            Expression::Boolean { pos, .. }
            | Expression::Int { pos, .. }
            | Expression::Float { pos, .. }
            | Expression::String { pos, .. }
            | Expression::Null { pos, .. }
            | Expression::Array { pos, .. }
            | Expression::Pair { pos, .. }
            | Expression::Map { pos, .. }
            | Expression::Struct { pos, .. }
            | Expression::Ident { pos, .. }
            | Expression::At { pos, .. }
            | Expression::Get { pos, .. }
            | Expression::IfThenElse { pos, .. }
            | Expression::Apply { pos, .. }
            | Expression::BinaryOp { pos, .. }
            | Expression::UnaryOp { pos, .. } => pos,
        }
    }

    fn set_source_position(&mut self, new_pos: SourcePosition) {
        match self {
            Expression::Boolean { pos, .. }
            | Expression::Int { pos, .. }
            | Expression::Float { pos, .. }
            | Expression::String { pos, .. }
            | Expression::Null { pos, .. }
            | Expression::Array { pos, .. }
            | Expression::Pair { pos, .. }
            | Expression::Map { pos, .. }
            | Expression::Struct { pos, .. }
            | Expression::Ident { pos, .. }
            | Expression::At { pos, .. }
            | Expression::Get { pos, .. }
            | Expression::IfThenElse { pos, .. }
            | Expression::Apply { pos, .. }
            | Expression::BinaryOp { pos, .. }
            | Expression::UnaryOp { pos, .. } => *pos = new_pos,
        }
    }
}

impl Expression {
    /// Array literal; its type is left to the checker.
    pub fn array(pos: SourcePosition, items: Vec<Expression>) -> Self {
        Expression::Array {
            pos,
            items,
            inferred_type: None,
        }
    }

    pub fn pair(pos: SourcePosition, left: Expression, right: Expression) -> Self {
        Expression::Pair {
            pos,
            left: Box::new(left),
            right: Box::new(right),
            inferred_type: None,
        }
    }

    /// `left op right`, untyped until [`with_type`](Expression::with_type).
    pub fn binary_op(
        pos: SourcePosition,
        op: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Self {
        Expression::BinaryOp {
            pos,
            op,
            left: Box::new(left),
            right: Box::new(right),
            inferred_type: None,
        }
    }

    /// Convenience method to get source position
    pub fn pos(&self) -> &SourcePosition {
        HasSourcePosition::source_position(self)
    }

    /// The type attached by the type-checker, if any.
    pub fn inferred_type(&self) -> Option<&Type> {
        match self {
            Expression::Boolean { inferred_type, .. }
            | Expression::Int { inferred_type, .. }
            | Expression::Float { inferred_type, .. }
            | Expression::String { inferred_type, .. }
            | Expression::Null { inferred_type, .. }
            | Expression::Array { inferred_type, .. }
            | Expression::Pair { inferred_type, .. }
            | Expression::Map { inferred_type, .. }
            | Expression::Struct { inferred_type, .. }
            | Expression::Ident { inferred_type, .. }
            | Expression::At { inferred_type, .. }
            | Expression::Get { inferred_type, .. }
            | Expression::IfThenElse { inferred_type, .. }
            | Expression::Apply { inferred_type, .. }
            | Expression::BinaryOp { inferred_type, .. }
            | Expression::UnaryOp { inferred_type, .. } => inferred_type.as_ref(),
        }
    }

    /// Attach a type, as the type-checker does.
    pub fn with_type(mut self, ty: Type) -> Self {
        match &mut self {
            Expression::Boolean { inferred_type, .. }
            | Expression::Int { inferred_type, .. }
            | Expression::Float { inferred_type, .. }
            | Expression::String { inferred_type, .. }
            | Expression::Null { inferred_type, .. }
            | Expression::Array { inferred_type, .. }
            | Expression::Pair { inferred_type, .. }
            | Expression::Map { inferred_type, .. }
            | Expression::Struct { inferred_type, .. }
            | Expression::Ident { inferred_type, .. }
            | Expression::At { inferred_type, .. }
            | Expression::Get { inferred_type, .. }
            | Expression::IfThenElse { inferred_type, .. }
            | Expression::Apply { inferred_type, .. }
            | Expression::BinaryOp { inferred_type, .. }
            | Expression::UnaryOp { inferred_type, .. } => *inferred_type = Some(ty),
        }
        self
    }

    /// Get all direct child expressions
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::String { parts, .. } => parts
                .iter()
                .filter_map(|part| match part {
                    StringPart::Placeholder { expr, .. } => Some(expr.as_ref()),
                    StringPart::Text(_) => None,
                })
                .collect(),
            Expression::Array { items, .. } => items.iter().collect(),
            Expression::Pair { left, right, .. } => vec![left, right],
            Expression::Map { pairs, .. } => pairs.iter().flat_map(|(k, v)| [k, v]).collect(),
            Expression::Struct { members, .. } => members.iter().map(|(_, e)| e).collect(),
            Expression::At { expr, index, .. } => vec![expr, index],
            Expression::Get { expr, .. } => vec![expr],
            Expression::IfThenElse {
                condition,
                true_expr,
                false_expr,
                ..
            } => vec![condition, true_expr, false_expr],
            Expression::Apply { arguments, .. } => arguments.iter().collect(),
            Expression::BinaryOp { left, right, .. } => vec![left, right],
            Expression::UnaryOp { operand, .. } => vec![operand],
            Expression::Boolean { .. }
            | Expression::Int { .. }
            | Expression::Float { .. }
            | Expression::Null { .. }
            | Expression::Ident { .. } => Vec::new(),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = T>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Boolean { value, .. } => write!(f, "{}", value),
            Expression::Int { value, .. } => write!(f, "{}", value),
            Expression::Float { value, .. } => write!(f, "{}", value),
            Expression::String { parts, .. } => {
                write!(f, "\"")?;
                for part in parts {
                    match part {
                        StringPart::Text(text) => write!(f, "{}", text)?,
                        StringPart::Placeholder { expr, .. } => write!(f, "~{{{}}}", expr)?,
                    }
                }
                write!(f, "\"")
            }
            Expression::Null { .. } => write!(f, "None"),
            Expression::Array { items, .. } => {
                write!(f, "[")?;
                write_list(f, items.iter())?;
                write!(f, "]")
            }
            Expression::Pair { left, right, .. } => write!(f, "({}, {})", left, right),
            Expression::Map { pairs, .. } => {
                write!(f, "{{")?;
                write_list(f, pairs.iter().map(|(k, v)| format!("{}: {}", k, v)))?;
                write!(f, "}}")
            }
            Expression::Struct { members, .. } => {
                write!(f, "object {{")?;
                write_list(f, members.iter().map(|(k, v)| format!("{}: {}", k, v)))?;
                write!(f, "}}")
            }
            Expression::Ident { name, .. } => write!(f, "{}", name),
            Expression::At { expr, index, .. } => write!(f, "{}[{}]", expr, index),
            Expression::Get { expr, field, .. } => write!(f, "{}.{}", expr, field),
            Expression::IfThenElse {
                condition,
                true_expr,
                false_expr,
                ..
            } => write!(f, "if {} then {} else {}", condition, true_expr, false_expr),
            Expression::Apply {
                function_name,
                arguments,
                ..
            } => {
                write!(f, "{}(", function_name)?;
                write_list(f, arguments.iter())?;
                write!(f, ")")
            }
            Expression::BinaryOp {
                op, left, right, ..
            } => write!(f, "{} {} {}", left, op.symbol(), right),
            Expression::UnaryOp { op, operand, .. } => {
                let op_str = match op {
                    UnaryOperator::Not => "!",
                    UnaryOperator::Negate => "-",
                };
                write!(f, "{}{}", op_str, operand)
            }
        }
    }
}
