//! Error types and source position tracking for block compilation and wire
//! serialization.
//!
//! Every failure the crate reports is a variant of [`WdlError`]. None of them
//! are retried internally; the variants carry enough context (types, values,
//! identifiers) to diagnose a failure without re-running the compile.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source position information for AST nodes and errors.
///
/// Contains both the original URI/filename and resolved absolute path,
/// along with one-based line and column positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    /// The filename/URI the document was loaded from (may be relative)
    pub uri: String,
    /// The absolute filename/URI after path resolution
    pub abspath: String,
    /// One-based line number where the construct starts
    pub line: u32,
    /// One-based column number where the construct starts
    pub column: u32,
    /// One-based line number where the construct ends
    pub end_line: u32,
    /// One-based column number where the construct ends
    pub end_column: u32,
}

impl SourcePosition {
    pub fn new(
        uri: String,
        abspath: String,
        line: u32,
        column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            uri,
            abspath,
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Position for synthesized nodes that have no location in a document.
    pub fn unknown() -> Self {
        Self::new(String::new(), String::new(), 0, 0, 0, 0)
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Main error type for block compilation and value serialization.
#[derive(Error, Debug)]
pub enum WdlError {
    /// A block splitting/categorization invariant did not hold. This is a
    /// defect in the splitter, never a user error.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    /// `T??` in a type or a value
    #[error("Double optional is not supported: type {wdl_type}, value {value}")]
    DoubleOptional { wdl_type: String, value: String },

    /// Struct field present on one side (type or value) but not the other
    #[error("Struct field '{field}' is missing: type {wdl_type}, value {value}")]
    MissingStructField {
        field: String,
        wdl_type: String,
        value: String,
    },

    /// Wire map whose key and value arrays have different lengths
    #[error("Map has {keys} keys but {values} values: type {wdl_type}, value {value}")]
    MapLengthMismatch {
        keys: usize,
        values: usize,
        wdl_type: String,
        value: String,
    },

    /// An object carrying the escape key alongside other keys
    #[error("Malformed escape hash: type {wdl_type}, value {value}")]
    MalformedEscapeHash { wdl_type: String, value: String },

    /// Any other (type, value) combination the serializer cannot handle
    #[error("Unsupported conversion: type {wdl_type}, value {value}")]
    UnsupportedConversion { wdl_type: String, value: String },

    /// A referenced remote file is not in the live state
    #[error("File {file_id} is not live, its archival state is {state}")]
    FileNotLive { file_id: String, state: String },

    /// Requesting an operation a category does not support
    #[error("Operation {operation} is not supported for category {category}")]
    UnsupportedOperation { category: String, operation: String },

    /// Nested block path that does not address a block
    #[error("Invalid block path {path:?}: no block at index {index}")]
    InvalidBlockPath { path: Vec<usize>, index: usize },

    /// Free identifier without an inferred type
    #[error("Unknown identifier: {name}")]
    UnknownIdentifier { pos: SourcePosition, name: String },

    /// Variable name that cannot be encoded as a platform field name
    #[error("Invalid variable name: {name}")]
    InvalidVarName { name: String },

    /// Failure reported by the platform collaborator
    #[error("Platform error: {message}")]
    Platform { message: String },

    /// Error reading or writing the compiler configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl WdlError {
    /// Get the source position for this error, if available.
    pub fn source_position(&self) -> Option<&SourcePosition> {
        match self {
            WdlError::UnknownIdentifier { pos, .. } => Some(pos),
            _ => None,
        }
    }

    pub fn invariant_violation(message: impl Into<String>) -> Self {
        WdlError::InvariantViolation {
            message: message.into(),
        }
    }

    pub fn double_optional(wdl_type: impl ToString, value: impl ToString) -> Self {
        WdlError::DoubleOptional {
            wdl_type: wdl_type.to_string(),
            value: value.to_string(),
        }
    }

    pub fn missing_struct_field(
        field: impl Into<String>,
        wdl_type: impl ToString,
        value: impl ToString,
    ) -> Self {
        WdlError::MissingStructField {
            field: field.into(),
            wdl_type: wdl_type.to_string(),
            value: value.to_string(),
        }
    }

    pub fn unsupported_conversion(wdl_type: impl ToString, value: impl ToString) -> Self {
        WdlError::UnsupportedConversion {
            wdl_type: wdl_type.to_string(),
            value: value.to_string(),
        }
    }

    pub fn unsupported_operation(category: impl Into<String>, operation: impl Into<String>) -> Self {
        WdlError::UnsupportedOperation {
            category: category.into(),
            operation: operation.into(),
        }
    }

    pub fn platform(message: impl Into<String>) -> Self {
        WdlError::Platform {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        WdlError::Config {
            message: message.into(),
        }
    }
}

/// Trait for AST nodes that have source position information.
pub trait HasSourcePosition {
    fn source_position(&self) -> &SourcePosition;
    fn set_source_position(&mut self, pos: SourcePosition);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_position_ordering() {
        let pos1 = SourcePosition::new("test.wdl".to_string(), "/test.wdl".to_string(), 1, 1, 1, 5);
        let pos2 = SourcePosition::new("test.wdl".to_string(), "/test.wdl".to_string(), 1, 6, 1, 10);
        let pos3 = SourcePosition::new("test.wdl".to_string(), "/test.wdl".to_string(), 2, 1, 2, 5);

        assert!(pos1 < pos2);
        assert!(pos2 < pos3);
        assert_eq!(SourcePosition::default(), SourcePosition::unknown());
    }

    #[test]
    fn test_double_optional_message() {
        let error = WdlError::double_optional("Int??", "5");
        assert_eq!(
            error.to_string(),
            "Double optional is not supported: type Int??, value 5"
        );
    }

    #[test]
    fn test_file_not_live_message() {
        let error = WdlError::FileNotLive {
            file_id: "file-A".to_string(),
            state: "archived".to_string(),
        };
        assert!(error.to_string().contains("file-A"));
        assert!(error.to_string().contains("archived"));
        assert!(error.source_position().is_none());
    }

    #[test]
    fn test_unknown_identifier_position() {
        let pos = SourcePosition::new("wf.wdl".to_string(), "/wf.wdl".to_string(), 3, 2, 3, 9);
        let error = WdlError::UnknownIdentifier {
            pos: pos.clone(),
            name: "x".to_string(),
        };
        assert_eq!(error.source_position(), Some(&pos));
    }
}
