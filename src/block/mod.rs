//! Splitting workflow bodies into blocks
//!
//! The platform runs flat, bounded units of work. A block is the smallest
//! sequence of workflow elements that compiles to one such unit: any number of
//! call-free elements followed by at most one element that is, or contains, a
//! call. [`split_to_blocks`] partitions a body into blocks, [`category`]
//! classifies each block into an execution strategy, and [`closure`] computes
//! what a block needs from, and exposes to, its surroundings.

use crate::error::{HasSourcePosition, WdlError};
use crate::tree::{deep_find_calls, Declaration, Workflow, WorkflowElement};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod category;
pub mod closure;

#[cfg(test)]
mod tests;

pub use category::{categorize, get_sub_block, Category};
pub use closure::{
    closure, expr_inputs, inputs_used_as_outputs, is_simple_output, output_closure, outputs,
    Closure, ClosureEntry,
};

/// Minimal element sequence compiled as one platform job.
///
/// Blocks produced by [`split_to_blocks`] keep every call in the last element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    nodes: Vec<WorkflowElement>,
}

impl Block {
    pub fn new(nodes: Vec<WorkflowElement>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[WorkflowElement] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<WorkflowElement> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every element except the last.
    pub fn prefix(&self) -> &[WorkflowElement] {
        match self.nodes.split_last() {
            Some((_, prefix)) => prefix,
            None => &[],
        }
    }

    /// The last element, which holds the block's call if it has one.
    pub fn terminal(&self) -> Option<&WorkflowElement> {
        self.nodes.last()
    }

    /// No call at any depth.
    pub fn is_pure_expressions(&self) -> bool {
        deep_find_calls(&self.nodes).is_empty()
    }

    /// Check the block invariant: the prefix is call-free.
    pub fn validate(&self) -> Result<(), WdlError> {
        if self.nodes.is_empty() {
            return Err(WdlError::invariant_violation("empty block"));
        }
        let prefix_calls = deep_find_calls(self.prefix());
        if let Some(call) = prefix_calls.first() {
            let pos = call.pos.clone();
            return Err(WdlError::invariant_violation(format!(
                "call {} at {}:{} is not the last element of its block ({} calls in the block prefix)",
                call.name(),
                pos.uri,
                pos.line,
                prefix_calls.len()
            )));
        }
        Ok(())
    }

    pub fn categorize(&self) -> Result<Category, WdlError> {
        categorize(self)
    }

    pub fn closure(&self) -> Result<Closure, WdlError> {
        closure(self)
    }
}

/// A workflow partitioned for compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitWorkflow {
    /// Inputs without a default; the caller must supply them
    pub inputs: Vec<Declaration>,
    /// Inputs whose initializer provides a default
    pub inputs_with_defaults: Vec<Declaration>,
    pub blocks: Vec<Block>,
    pub outputs: Vec<Declaration>,
}

/// Partition a workflow into its inputs, body blocks and outputs.
pub fn split(workflow: &Workflow) -> SplitWorkflow {
    let (inputs_with_defaults, inputs): (Vec<Declaration>, Vec<Declaration>) = workflow
        .inputs
        .iter()
        .cloned()
        .partition(|decl| decl.expr.is_some());
    let blocks = split_to_blocks(&workflow.body);
    debug!(
        workflow = %workflow.name,
        required_inputs = inputs.len(),
        inputs_with_defaults = inputs_with_defaults.len(),
        blocks = blocks.len(),
        outputs = workflow.outputs.len(),
        "split workflow"
    );
    SplitWorkflow {
        inputs,
        inputs_with_defaults,
        blocks,
        outputs: workflow.outputs.clone(),
    }
}

/// Partition a sequence of elements into blocks.
///
/// A block is closed right after each element that is, or contains, a call.
/// Call-free elements are carried into the block of the next call; whatever
/// remains after the last call forms a final expressions-only block.
/// Concatenating the returned blocks yields `elements` again.
pub fn split_to_blocks(elements: &[WorkflowElement]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<WorkflowElement> = Vec::new();

    for element in elements {
        current.push(element.clone());
        if element.contains_call() {
            let line = element.source_position().line;
            debug!(index = blocks.len(), size = current.len(), line, "closing block at call");
            blocks.push(Block::new(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        debug!(index = blocks.len(), size = current.len(), "trailing expressions block");
        blocks.push(Block::new(current));
    }
    blocks
}
