//! Typed workflow AST consumed by the block compiler
//!
//! The parser and type-checker produce this tree; this crate never parses
//! WDL source itself. A workflow body is an ordered sequence of
//! [`WorkflowElement`]s, and scatter/conditional sections nest further
//! sequences of elements to arbitrary depth.

use crate::error::{HasSourcePosition, SourcePosition};
use crate::expr::Expression;
use crate::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Value declaration within a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub pos: SourcePosition,
    pub decl_type: Type,
    pub name: String,
    pub expr: Option<Expression>,
}

impl Declaration {
    pub fn new(
        pos: SourcePosition,
        decl_type: Type,
        name: impl Into<String>,
        expr: Option<Expression>,
    ) -> Self {
        Self {
            pos,
            decl_type,
            name: name.into(),
            expr,
        }
    }
}

/// Task or workflow call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub pos: SourcePosition,
    /// Task or workflow name, potentially namespaced (e.g., "lib.task_name")
    pub task: String,
    pub alias: Option<String>,
    pub inputs: IndexMap<String, Expression>,
    /// Output signature of the callee, filled in by the type-checker
    pub outputs: IndexMap<String, Type>,
}

impl Call {
    pub fn new(
        pos: SourcePosition,
        task: impl Into<String>,
        alias: Option<String>,
        inputs: IndexMap<String, Expression>,
    ) -> Self {
        Self {
            pos,
            task: task.into(),
            alias,
            inputs,
            outputs: IndexMap::new(),
        }
    }

    pub fn with_outputs(mut self, outputs: IndexMap<String, Type>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Get the effective name of this call (alias if present, otherwise task name)
    pub fn name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            // "lib.hello" is called as "hello"
            None => self.task.split('.').next_back().unwrap_or(&self.task),
        }
    }

    /// All input expressions are trivial, so the call can be wired directly.
    pub fn has_trivial_inputs(&self) -> bool {
        self.inputs.values().all(Expression::is_trivial)
    }

    /// The call's outputs viewed as one value, as later elements see `name.*`.
    pub fn output_type(&self) -> Type {
        Type::struct_type(self.task.clone(), self.outputs.clone())
    }
}

/// Base trait for workflow sections (scatter, conditional)
pub trait WorkflowSection {
    /// Get the body elements of this section
    fn body(&self) -> &[WorkflowElement];

    /// The section's header expression (collection or condition)
    fn header_expr(&self) -> &Expression;
}

/// Scatter section for parallel execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter {
    pub pos: SourcePosition,
    pub variable: String,
    pub expr: Expression,
    pub body: Vec<WorkflowElement>,
}

impl Scatter {
    pub fn new(
        pos: SourcePosition,
        variable: impl Into<String>,
        expr: Expression,
        body: Vec<WorkflowElement>,
    ) -> Self {
        Self {
            pos,
            variable: variable.into(),
            expr,
            body,
        }
    }

    /// Type of the loop variable: the collection's item type.
    pub fn variable_type(&self) -> Option<Type> {
        match self.expr.inferred_type().map(Type::strip_optional) {
            Some(Type::Array { item_type, .. }) => Some(item_type.as_ref().clone()),
            _ => None,
        }
    }
}

impl WorkflowSection for Scatter {
    fn body(&self) -> &[WorkflowElement] {
        &self.body
    }

    fn header_expr(&self) -> &Expression {
        &self.expr
    }
}

/// Conditional section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub pos: SourcePosition,
    pub expr: Expression,
    pub body: Vec<WorkflowElement>,
}

impl Conditional {
    pub fn new(pos: SourcePosition, expr: Expression, body: Vec<WorkflowElement>) -> Self {
        Self { pos, expr, body }
    }
}

impl WorkflowSection for Conditional {
    fn body(&self) -> &[WorkflowElement] {
        &self.body
    }

    fn header_expr(&self) -> &Expression {
        &self.expr
    }
}

/// Workflow node enum for unified handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowElement {
    Declaration(Declaration),
    Call(Call),
    Scatter(Box<Scatter>),
    Conditional(Box<Conditional>),
}

impl WorkflowElement {
    /// The name this element binds directly, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            WorkflowElement::Declaration(decl) => Some(&decl.name),
            WorkflowElement::Call(call) => Some(call.name()),
            WorkflowElement::Scatter(_) | WorkflowElement::Conditional(_) => None,
        }
    }

    /// Section body for scatters and conditionals.
    pub fn section(&self) -> Option<&dyn WorkflowSection> {
        match self {
            WorkflowElement::Scatter(scatter) => Some(scatter.as_ref()),
            WorkflowElement::Conditional(cond) => Some(cond.as_ref()),
            WorkflowElement::Declaration(_) | WorkflowElement::Call(_) => None,
        }
    }

    /// Every call in this element, searching section bodies at any depth.
    pub fn calls(&self) -> Vec<&Call> {
        let mut calls = Vec::new();
        collect_calls(self, &mut calls);
        calls
    }

    /// The element is a call or deep-contains one.
    pub fn contains_call(&self) -> bool {
        match self {
            WorkflowElement::Call(_) => true,
            WorkflowElement::Declaration(_) => false,
            WorkflowElement::Scatter(scatter) => scatter.body.iter().any(Self::contains_call),
            WorkflowElement::Conditional(cond) => cond.body.iter().any(Self::contains_call),
        }
    }
}

impl HasSourcePosition for WorkflowElement {
    fn source_position(&self) -> &SourcePosition {
        match self {
            WorkflowElement::Declaration(decl) => &decl.pos,
            WorkflowElement::Call(call) => &call.pos,
            WorkflowElement::Scatter(scatter) => &scatter.pos,
            WorkflowElement::Conditional(cond) => &cond.pos,
        }
    }

    fn set_source_position(&mut self, new_pos: SourcePosition) {
        match self {
            WorkflowElement::Declaration(decl) => decl.pos = new_pos,
            WorkflowElement::Call(call) => call.pos = new_pos,
            WorkflowElement::Scatter(scatter) => scatter.pos = new_pos,
            WorkflowElement::Conditional(cond) => cond.pos = new_pos,
        }
    }
}

impl From<Declaration> for WorkflowElement {
    fn from(decl: Declaration) -> Self {
        WorkflowElement::Declaration(decl)
    }
}

impl From<Call> for WorkflowElement {
    fn from(call: Call) -> Self {
        WorkflowElement::Call(call)
    }
}

impl From<Scatter> for WorkflowElement {
    fn from(scatter: Scatter) -> Self {
        WorkflowElement::Scatter(Box::new(scatter))
    }
}

impl From<Conditional> for WorkflowElement {
    fn from(cond: Conditional) -> Self {
        WorkflowElement::Conditional(Box::new(cond))
    }
}

fn collect_calls<'a>(element: &'a WorkflowElement, calls: &mut Vec<&'a Call>) {
    match element {
        WorkflowElement::Call(call) => calls.push(call),
        WorkflowElement::Declaration(_) => {}
        WorkflowElement::Scatter(scatter) => {
            for inner in &scatter.body {
                collect_calls(inner, calls);
            }
        }
        WorkflowElement::Conditional(cond) => {
            for inner in &cond.body {
                collect_calls(inner, calls);
            }
        }
    }
}

/// Deep call search over a sequence of elements.
pub fn deep_find_calls(elements: &[WorkflowElement]) -> Vec<&Call> {
    elements.iter().flat_map(WorkflowElement::calls).collect()
}

/// WDL Workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub pos: SourcePosition,
    pub name: String,
    pub inputs: Vec<Declaration>,
    pub body: Vec<WorkflowElement>,
    pub outputs: Vec<Declaration>,
}

impl Workflow {
    pub fn new(
        pos: SourcePosition,
        name: impl Into<String>,
        inputs: Vec<Declaration>,
        body: Vec<WorkflowElement>,
        outputs: Vec<Declaration>,
    ) -> Self {
        Self {
            pos,
            name: name.into(),
            inputs,
            body,
            outputs,
        }
    }
}
