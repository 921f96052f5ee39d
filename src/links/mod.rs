//! Values in flight between compiled stages
//!
//! A [`WdlVarLinks`] pairs a WDL type with where its value comes from: an
//! inline wire value known at compile time, or a reference to a port of a
//! stage, of the enclosing workflow, or of a running execution.

use crate::dx::{workflow_input_reference, DxExecution, DxStage};
use crate::error::WdlError;
use crate::types::Type;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod serializer;

pub use serializer::{
    decode_dots, encode_dots, find_dx_files, from_wire, gen_fields, read_field, to_wire,
    WireSerializer,
};

/// Field key wrapping a non-native structured value.
pub const ESCAPE_KEY: &str = "___";

/// Suffix of the companion field listing the files of a structured value.
pub const FLAT_FILES_SUFFIX: &str = "___dxfiles";

/// Direction of a stage port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoRef {
    Input,
    Output,
}

/// Source of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DxLink {
    /// Known at compile time, in wire form
    Value(JsonValue),
    Stage {
        stage: DxStage,
        io_ref: IoRef,
        port: String,
    },
    WorkflowInput { port: String },
    Execution { execution: DxExecution, port: String },
}

impl DxLink {
    pub fn kind(&self) -> &'static str {
        match self {
            DxLink::Value(_) => "Value",
            DxLink::Stage { .. } => "Stage",
            DxLink::WorkflowInput { .. } => "WorkflowInput",
            DxLink::Execution { .. } => "Execution",
        }
    }

    /// Reference to this link's port, or to a companion port named by
    /// appending `suffix`. Inline values have no ports.
    pub(crate) fn port_reference(&self, suffix: &str) -> Option<JsonValue> {
        match self {
            DxLink::Value(_) => None,
            DxLink::Stage {
                stage,
                io_ref: IoRef::Input,
                port,
            } => Some(stage.input_reference(&format!("{}{}", port, suffix))),
            DxLink::Stage {
                stage,
                io_ref: IoRef::Output,
                port,
            } => Some(stage.output_reference(&format!("{}{}", port, suffix))),
            DxLink::WorkflowInput { port } => {
                Some(workflow_input_reference(&format!("{}{}", port, suffix)))
            }
            DxLink::Execution { execution, port } => {
                Some(execution.output_reference(&format!("{}{}", port, suffix)))
            }
        }
    }
}

/// A typed value source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WdlVarLinks {
    pub wdl_type: Type,
    pub link: DxLink,
}

impl WdlVarLinks {
    pub fn new(wdl_type: Type, link: DxLink) -> Self {
        Self { wdl_type, link }
    }

    /// Inline a compile-time value.
    pub fn import_from_value(wdl_type: Type, value: &Value) -> Result<Self, WdlError> {
        Self::import_with(&WireSerializer::new(), wdl_type, value)
    }

    /// Inline a compile-time value, serializing files through `serializer`.
    pub fn import_with(
        serializer: &WireSerializer<'_>,
        wdl_type: Type,
        value: &Value,
    ) -> Result<Self, WdlError> {
        let json = serializer.to_wire(&wdl_type, value)?;
        Ok(Self::new(wdl_type, DxLink::Value(json)))
    }

    /// Decode an inline value. References to other stages have no value yet.
    pub fn eval(&self) -> Result<Value, WdlError> {
        match &self.link {
            DxLink::Value(json) => from_wire(&self.wdl_type, json),
            other => Err(WdlError::unsupported_operation(other.kind(), "eval")),
        }
    }

    /// Input/output fields carrying this value under `name`.
    pub fn gen_fields(&self, name: &str, encode: bool) -> Result<Vec<(String, JsonValue)>, WdlError> {
        gen_fields(self, name, encode)
    }
}
