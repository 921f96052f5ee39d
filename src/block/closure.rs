//! Closures and outputs of blocks
//!
//! A block's closure is the set of values it reads from outside itself; its
//! outputs are the bindings later blocks may read from it. Both drive the
//! port wiring between compiled stages.

use super::Block;
use crate::env::Bindings;
use crate::error::WdlError;
use crate::expr::Expression;
use crate::tree::{Declaration, WorkflowElement};
use crate::types::Type;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A free variable of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureEntry {
    pub wdl_type: Type,
    /// The value may be omitted by the caller (optional type)
    pub has_default: bool,
}

/// Free variables by name, in order of first reference.
pub type Closure = IndexMap<String, ClosureEntry>;

/// Values a block reads from its enclosing scope.
pub fn closure(block: &Block) -> Result<Closure, WdlError> {
    let mut free = Closure::new();
    walk(block.nodes(), &Bindings::new(), &mut free)?;
    Ok(free)
}

/// Bindings a block exposes to later blocks.
///
/// Names bound inside a scatter are seen outside as arrays, names bound inside
/// a conditional as optionals. Call outputs appear as `call.output`.
pub fn outputs(block: &Block) -> IndexMap<String, Type> {
    element_outputs(block.nodes())
}

/// Free variables of the workflow's output expressions.
///
/// An output may read an output declared before it; such names are not free.
pub fn output_closure(outputs: &[Declaration]) -> IndexSet<String> {
    let mut declared: Bindings<Type> = Bindings::new();
    let mut free = IndexSet::new();
    for output in outputs {
        if let Some(expr) = &output.expr {
            for reference in expr.references() {
                if !declared.covers(&reference.name) {
                    free.insert(reference.name);
                }
            }
        }
        declared = declared.bind(output.name.clone(), output.decl_type.clone());
    }
    free
}

/// Workflow inputs read directly by the output section.
pub fn inputs_used_as_outputs(inputs: &[Declaration], outputs: &[Declaration]) -> IndexSet<String> {
    let used = output_closure(outputs);
    inputs
        .iter()
        .filter(|input| used.contains(&input.name))
        .map(|input| input.name.clone())
        .collect()
}

/// Names an expression reads.
pub fn expr_inputs(expr: &Expression) -> IndexSet<String> {
    expr.free_identifiers().into_iter().map(|r| r.name).collect()
}

/// Outputs that are a constant or a plain reference need no evaluation stage.
pub fn is_simple_output(output: &Declaration) -> bool {
    output.expr.as_ref().is_some_and(Expression::is_trivial)
}

fn walk(
    elements: &[WorkflowElement],
    outer: &Bindings<Type>,
    free: &mut Closure,
) -> Result<Bindings<Type>, WdlError> {
    let mut scope = outer.clone();
    for element in elements {
        match element {
            WorkflowElement::Declaration(decl) => {
                if let Some(expr) = &decl.expr {
                    record_free(expr, &scope, free)?;
                }
                scope = scope.bind(decl.name.clone(), decl.decl_type.clone());
            }
            WorkflowElement::Call(call) => {
                for expr in call.inputs.values() {
                    record_free(expr, &scope, free)?;
                }
                scope = scope.bind(call.name(), call.output_type());
            }
            WorkflowElement::Conditional(cond) => {
                record_free(&cond.expr, &scope, free)?;
                walk(&cond.body, &scope, free)?;
                for (name, ty) in wrap_section_outputs(&cond.body, Type::optional) {
                    scope = scope.bind(name, ty);
                }
            }
            WorkflowElement::Scatter(scatter) => {
                record_free(&scatter.expr, &scope, free)?;
                let item_type = scatter.variable_type().ok_or_else(|| WdlError::UnknownIdentifier {
                    pos: scatter.pos.clone(),
                    name: scatter.variable.clone(),
                })?;
                let inner = scope.bind(scatter.variable.clone(), item_type);
                walk(&scatter.body, &inner, free)?;
                for (name, ty) in wrap_section_outputs(&scatter.body, Type::array) {
                    scope = scope.bind(name, ty);
                }
            }
        }
    }
    Ok(scope)
}

fn record_free(expr: &Expression, scope: &Bindings<Type>, free: &mut Closure) -> Result<(), WdlError> {
    for reference in expr.references() {
        if scope.covers(&reference.name) || free.contains_key(&reference.name) {
            continue;
        }
        let wdl_type = reference.ty.ok_or_else(|| WdlError::UnknownIdentifier {
            pos: reference.pos.clone(),
            name: reference.name.clone(),
        })?;
        free.insert(
            reference.name,
            ClosureEntry {
                has_default: wdl_type.is_optional(),
                wdl_type,
            },
        );
    }
    Ok(())
}

fn wrap_section_outputs(body: &[WorkflowElement], wrap: fn(Type) -> Type) -> IndexMap<String, Type> {
    element_outputs(body)
        .into_iter()
        .map(|(name, ty)| (name, wrap(ty)))
        .collect()
}

fn element_outputs(elements: &[WorkflowElement]) -> IndexMap<String, Type> {
    let mut exposed = IndexMap::new();
    for element in elements {
        match element {
            WorkflowElement::Declaration(decl) => {
                exposed.insert(decl.name.clone(), decl.decl_type.clone());
            }
            WorkflowElement::Call(call) => {
                for (output, ty) in &call.outputs {
                    exposed.insert(format!("{}.{}", call.name(), output), ty.clone());
                }
            }
            WorkflowElement::Conditional(cond) => {
                exposed.extend(wrap_section_outputs(&cond.body, Type::optional));
            }
            WorkflowElement::Scatter(scatter) => {
                exposed.extend(wrap_section_outputs(&scatter.body, Type::array));
            }
        }
    }
    exposed
}
