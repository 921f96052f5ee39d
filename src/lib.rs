//! # flowy-dx
//!
//! Compiler core for running WDL workflows on a remote execution platform.
//!
//! A workflow body is split into [`block::Block`]s, each compiled to one
//! platform job, and classified into an execution strategy by
//! [`block::categorize`]. Values crossing stage boundaries are described by
//! [`links::WdlVarLinks`] and serialized to the platform's JSON wire format by
//! [`links::serializer`]. A [`session::CompileSession`] drives one pass.

pub mod block;
pub mod config;
pub mod dx;
pub mod env;
pub mod error;
pub mod expr;
pub mod links;
pub mod session;
pub mod tree;
pub mod types;
pub mod value;

pub use block::{Block, Category, SplitWorkflow};
pub use config::CompilerConfig;
pub use dx::{DxFile, FileInfoCache, PlatformClient};
pub use env::Bindings;
pub use error::{SourcePosition, WdlError};
pub use expr::{BinaryOperator, Expression, StringPart, UnaryOperator};
pub use links::{DxLink, IoRef, WdlVarLinks};
pub use session::{BlockPlan, CompileSession, WorkflowPlan};
pub use tree::{Call, Conditional, Declaration, Scatter, Workflow, WorkflowElement};
pub use types::Type;
pub use value::Value;
