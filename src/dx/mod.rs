//! Remote platform handles and the platform collaborator interface
//!
//! Files live on the platform as opaque `file-…` objects inside projects. In
//! WDL values they travel as `dx://project-…:file-…` URIs; on the wire they are
//! `$dnanexus_link` objects. Stages and executions are referenced the same way.

use crate::error::WdlError;
use crate::types::Type;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;

pub mod cache;

pub use cache::FileInfoCache;

/// Key of every platform link object.
pub const DX_LINK_KEY: &str = "$dnanexus_link";

pub const DX_URI_PREFIX: &str = "dx://";

static DX_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^dx://(?:(project-[0-9A-Za-z]+):)?(file-[0-9A-Za-z]+)$")
        .unwrap_or_else(|e| panic!("invalid dx uri pattern: {}", e))
});

static FILE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^file-[0-9A-Za-z]+$").unwrap_or_else(|e| panic!("invalid file id pattern: {}", e))
});

/// Handle to a remote file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DxFile {
    pub project: Option<String>,
    pub id: String,
}

impl DxFile {
    pub fn new(project: Option<String>, id: impl Into<String>) -> Self {
        Self {
            project,
            id: id.into(),
        }
    }

    pub fn is_file_id(id: &str) -> bool {
        FILE_ID.is_match(id)
    }

    /// Parse `dx://[project-…:]file-…`. Any other path is not a platform file.
    pub fn parse_uri(uri: &str) -> Option<Self> {
        let captures = DX_URI.captures(uri)?;
        let project = captures.get(1).map(|m| m.as_str().to_string());
        let id = captures.get(2)?.as_str().to_string();
        Some(Self { project, id })
    }

    pub fn to_uri(&self) -> String {
        match &self.project {
            Some(project) => format!("{}{}:{}", DX_URI_PREFIX, project, self.id),
            None => format!("{}{}", DX_URI_PREFIX, self.id),
        }
    }

    /// `{"$dnanexus_link": {"project": …, "id": …}}`, or the bare id form
    /// when the project is unknown.
    pub fn to_wire_reference(&self) -> JsonValue {
        match &self.project {
            Some(project) => json!({ DX_LINK_KEY: { "project": project, "id": self.id } }),
            None => json!({ DX_LINK_KEY: self.id }),
        }
    }

    /// Recognize a file link in either form. Links to other object classes
    /// (jobs, stages) are not files.
    pub fn from_wire_reference(json: &JsonValue) -> Option<Self> {
        let obj = json.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        match obj.get(DX_LINK_KEY)? {
            JsonValue::String(id) if Self::is_file_id(id) => Some(Self::new(None, id.clone())),
            JsonValue::Object(link) => {
                let id = link.get("id")?.as_str()?;
                if !Self::is_file_id(id) {
                    return None;
                }
                let project = link.get("project").and_then(JsonValue::as_str).map(str::to_string);
                Some(Self::new(project, id))
            }
            _ => None,
        }
    }
}

impl fmt::Display for DxFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

/// Archival state of a remote file. Only live files can be read by jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivalState {
    Live,
    Archived,
    #[serde(rename = "archival")]
    Archiving,
    Unarchiving,
}

impl fmt::Display for ArchivalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchivalState::Live => "live",
            ArchivalState::Archived => "archived",
            ArchivalState::Archiving => "archival",
            ArchivalState::Unarchiving => "unarchiving",
        };
        write!(f, "{}", name)
    }
}

/// Describe record of a remote file, as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DxFileDescribe {
    pub project: String,
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified: DateTime<Utc>,
    pub archival_state: ArchivalState,
}

impl DxFileDescribe {
    pub fn from_json(json: &JsonValue) -> Result<Self, WdlError> {
        serde_json::from_value(json.clone())
            .map_err(|e| WdlError::platform(format!("malformed file description {}: {}", json, e)))
    }

    pub fn file(&self) -> DxFile {
        DxFile::new(Some(self.project.clone()), self.id.clone())
    }
}

/// A stage of a compiled platform workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DxStage {
    pub id: String,
}

impl DxStage {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn input_reference(&self, port: &str) -> JsonValue {
        json!({ DX_LINK_KEY: { "stage": self.id, "inputField": port } })
    }

    pub fn output_reference(&self, port: &str) -> JsonValue {
        json!({ DX_LINK_KEY: { "stage": self.id, "outputField": port } })
    }
}

/// A running or finished job or analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DxExecution {
    pub id: String,
}

impl DxExecution {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Execution-based object reference to one of the execution's outputs.
    pub fn output_reference(&self, port: &str) -> JsonValue {
        let class = if self.id.starts_with("analysis-") {
            "analysis"
        } else {
            "job"
        };
        json!({ DX_LINK_KEY: { class: self.id, "field": port } })
    }
}

/// Reference to an input of the enclosing platform workflow.
pub fn workflow_input_reference(port: &str) -> JsonValue {
    json!({ DX_LINK_KEY: { "workflowInputField": port } })
}

/// Types the platform represents natively as a single input/output field.
///
/// One level of optionality is stripped first. Arrays are native only when
/// their items are non-optional primitives.
pub fn is_native_dx_type(wdl_type: &Type) -> bool {
    match wdl_type.strip_optional() {
        t if t.is_primitive() => true,
        Type::Array { item_type, .. } => item_type.is_primitive(),
        _ => false,
    }
}

/// Narrow synchronous interface to the remote platform.
pub trait PlatformClient {
    /// Describe a batch of files in one request, keyed by file id.
    fn describe_files(&self, files: &[DxFile]) -> Result<HashMap<String, DxFileDescribe>, WdlError>;
}
