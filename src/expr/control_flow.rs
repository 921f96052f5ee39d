//! Function application, `if` and member access constructors

use super::Expression;
use crate::error::SourcePosition;

impl Expression {
    /// Create a new function application
    pub fn apply(
        pos: SourcePosition,
        function_name: impl Into<String>,
        arguments: Vec<Expression>,
    ) -> Self {
        Expression::Apply {
            pos,
            function_name: function_name.into(),
            arguments,
            inferred_type: None,
        }
    }

    /// Create a new conditional expression
    pub fn if_then_else(
        pos: SourcePosition,
        condition: Expression,
        true_expr: Expression,
        false_expr: Expression,
    ) -> Self {
        Expression::IfThenElse {
            pos,
            condition: Box::new(condition),
            true_expr: Box::new(true_expr),
            false_expr: Box::new(false_expr),
            inferred_type: None,
        }
    }

    /// Create a new member access expression
    pub fn get(pos: SourcePosition, expr: Expression, field: impl Into<String>) -> Self {
        Expression::Get {
            pos,
            expr: Box::new(expr),
            field: field.into(),
            inferred_type: None,
        }
    }
}
