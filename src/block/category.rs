//! Classifying blocks into execution strategies

use super::{split_to_blocks, Block};
use crate::error::WdlError;
use crate::tree::{Call, Conditional, Scatter, WorkflowElement, WorkflowSection};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Execution strategy for a block, decided by its terminal element.
///
/// Every variant carries the block's prefix: the elements before the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Category {
    /// No calls anywhere
    AllExpressions { nodes: Vec<WorkflowElement> },
    /// A call whose arguments are all constants or identifiers
    CallDirect {
        prefix: Vec<WorkflowElement>,
        call: Call,
    },
    /// A lone call with at least one computed argument
    CallWithSubexpressions {
        prefix: Vec<WorkflowElement>,
        call: Call,
    },
    /// A call with computed arguments, preceded by other elements
    CallFragment {
        prefix: Vec<WorkflowElement>,
        call: Call,
    },
    /// A conditional around exactly one directly wired call
    CondOneCall {
        prefix: Vec<WorkflowElement>,
        cond: Conditional,
        call: Call,
    },
    /// A conditional whose body must be compiled as a sub-workflow
    CondFullBlock {
        prefix: Vec<WorkflowElement>,
        cond: Conditional,
    },
    /// A scatter around exactly one directly wired call
    ScatterOneCall {
        prefix: Vec<WorkflowElement>,
        scatter: Scatter,
        call: Call,
    },
    /// A scatter whose body must be compiled as a sub-workflow
    ScatterFullBlock {
        prefix: Vec<WorkflowElement>,
        scatter: Scatter,
    },
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::AllExpressions { .. } => "AllExpressions",
            Category::CallDirect { .. } => "CallDirect",
            Category::CallWithSubexpressions { .. } => "CallWithSubexpressions",
            Category::CallFragment { .. } => "CallFragment",
            Category::CondOneCall { .. } => "CondOneCall",
            Category::CondFullBlock { .. } => "CondFullBlock",
            Category::ScatterOneCall { .. } => "ScatterOneCall",
            Category::ScatterFullBlock { .. } => "ScatterFullBlock",
        }
    }

    /// Elements before the terminal one. For `AllExpressions` this is
    /// every element but the last, like the other categories.
    pub fn prefix(&self) -> &[WorkflowElement] {
        match self {
            Category::AllExpressions { nodes } => match nodes.split_last() {
                Some((_, prefix)) => prefix,
                None => &[],
            },
            Category::CallDirect { prefix, .. }
            | Category::CallWithSubexpressions { prefix, .. }
            | Category::CallFragment { prefix, .. }
            | Category::CondOneCall { prefix, .. }
            | Category::CondFullBlock { prefix, .. }
            | Category::ScatterOneCall { prefix, .. }
            | Category::ScatterFullBlock { prefix, .. } => prefix,
        }
    }

    /// The call wired by this category, for the categories that have one.
    pub fn call(&self) -> Option<&Call> {
        match self {
            Category::CallDirect { call, .. }
            | Category::CallWithSubexpressions { call, .. }
            | Category::CallFragment { call, .. }
            | Category::CondOneCall { call, .. }
            | Category::ScatterOneCall { call, .. } => Some(call),
            Category::AllExpressions { .. }
            | Category::CondFullBlock { .. }
            | Category::ScatterFullBlock { .. } => None,
        }
    }

    /// Body of a full-block conditional or scatter.
    pub fn inner_body(&self) -> Result<&[WorkflowElement], WdlError> {
        match self {
            Category::CondFullBlock { cond, .. } => Ok(cond.body()),
            Category::ScatterFullBlock { scatter, .. } => Ok(scatter.body()),
            other => Err(WdlError::unsupported_operation(other.name(), "inner_body")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The section body is a single call with trivial inputs.
fn single_direct_call(body: &[WorkflowElement]) -> Option<&Call> {
    match body {
        [WorkflowElement::Call(call)] if call.has_trivial_inputs() => Some(call),
        _ => None,
    }
}

/// Classify a block by its terminal element.
///
/// Fails if a call appears before the terminal element, which means the
/// block was not produced by the splitter.
pub fn categorize(block: &Block) -> Result<Category, WdlError> {
    block.validate()?;
    let prefix = block.prefix().to_vec();
    let terminal = match block.terminal() {
        Some(terminal) => terminal,
        None => return Err(WdlError::invariant_violation("empty block")),
    };

    let category = if !terminal.contains_call() {
        Category::AllExpressions {
            nodes: block.nodes().to_vec(),
        }
    } else {
        match terminal {
            WorkflowElement::Call(call) if call.has_trivial_inputs() => Category::CallDirect {
                prefix,
                call: call.clone(),
            },
            WorkflowElement::Call(call) if block.len() == 1 => Category::CallWithSubexpressions {
                prefix,
                call: call.clone(),
            },
            WorkflowElement::Call(call) => Category::CallFragment {
                prefix,
                call: call.clone(),
            },
            WorkflowElement::Conditional(cond) => match single_direct_call(&cond.body) {
                Some(call) => Category::CondOneCall {
                    prefix,
                    call: call.clone(),
                    cond: cond.as_ref().clone(),
                },
                None => Category::CondFullBlock {
                    prefix,
                    cond: cond.as_ref().clone(),
                },
            },
            WorkflowElement::Scatter(scatter) => match single_direct_call(&scatter.body) {
                Some(call) => Category::ScatterOneCall {
                    prefix,
                    call: call.clone(),
                    scatter: scatter.as_ref().clone(),
                },
                None => Category::ScatterFullBlock {
                    prefix,
                    scatter: scatter.as_ref().clone(),
                },
            },
            WorkflowElement::Declaration(decl) => {
                return Err(WdlError::invariant_violation(format!(
                    "declaration {} reported as containing a call",
                    decl.name
                )))
            }
        }
    };
    debug!(category = category.name(), size = block.len(), "categorized block");
    Ok(category)
}

/// Locate a block nested inside full-block sections.
///
/// `path[0]` selects a block of `elements`; each further index selects a
/// block of the previous block's section body.
pub fn get_sub_block(path: &[usize], elements: &[WorkflowElement]) -> Result<Block, WdlError> {
    let (&first, rest) = match path.split_first() {
        Some(split) => split,
        None => {
            return Err(WdlError::InvalidBlockPath {
                path: Vec::new(),
                index: 0,
            })
        }
    };
    let mut block = select_block(split_to_blocks(elements), path, first)?;
    for &index in rest {
        let category = categorize(&block)?;
        let inner = category.inner_body()?;
        block = select_block(split_to_blocks(inner), path, index)?;
    }
    debug!(?path, size = block.len(), "resolved sub-block");
    Ok(block)
}

fn select_block(blocks: Vec<Block>, path: &[usize], index: usize) -> Result<Block, WdlError> {
    blocks
        .into_iter()
        .nth(index)
        .ok_or_else(|| WdlError::InvalidBlockPath {
            path: path.to_vec(),
            index,
        })
}
