//! # Error Types
//!
//! @title Analysis Errors and Diagnostics
//! @author Ramprasad
//!
//! Defines the library error type and the non-fatal diagnostics recorded while
//! extracting a contract.
//!
//! Only [`Error::NotFound`] and the document loading errors are fatal. Malformed
//! nodes and unsupported expression shapes met during extraction are converted into
//! [`Diagnostic`] records and the offending sub-tree is skipped.

use crate::ir::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading documents and extracting contracts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested contract (or other named entity) is absent from the loaded ASTs.
    #[error("{kind} `{name}` not found in the loaded ASTs")]
    NotFound { kind: &'static str, name: String },

    /// An AST node lacks a field its `nodeType` requires.
    #[error("{node_type} node is missing `{field}`{}", fmt_location(.location))]
    MalformedNode {
        node_type: String,
        field: &'static str,
        location: Option<SourceLocation>,
    },

    /// A node shape the extractor has no case for.
    #[error("unsupported {node_type} shape{}", fmt_location(.location))]
    UnsupportedShape {
        node_type: String,
        location: Option<SourceLocation>,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {} as JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but is not a compiler AST document we understand.
    #[error("{} is not a compiler AST document: {reason}", .path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("report template error: {0}")]
    Template(String),
}

fn fmt_location(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!(" at {}", loc),
        None => String::new(),
    }
}

/// Category of a non-fatal extraction problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedNode,
    UnsupportedShape,
    /// A modifier body with zero or several placeholders.
    Placeholder,
    /// A base contract named in an inheritance list is not loaded.
    UnresolvedBase,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MalformedNode => write!(f, "malformed node"),
            DiagnosticKind::UnsupportedShape => write!(f, "unsupported shape"),
            DiagnosticKind::Placeholder => write!(f, "placeholder"),
            DiagnosticKind::UnresolvedBase => write!(f, "unresolved base"),
        }
    }
}

/// A recorded omission from the extracted IR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub node_type: String,
    pub location: Option<SourceLocation>,
    pub message: String,
}

impl Diagnostic {
    /// Builds a placeholder diagnostic for a modifier.
    pub fn placeholder(modifier: &str, message: String) -> Self {
        Self {
            kind: DiagnosticKind::Placeholder,
            node_type: "ModifierDefinition".to_string(),
            location: None,
            message: format!("modifier `{}`: {}", modifier, message),
        }
    }

    pub fn unresolved_base(contract: &str, base: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedBase,
            node_type: "InheritanceSpecifier".to_string(),
            location: None,
            message: format!("base `{}` of `{}` is not in the loaded ASTs", base, contract),
        }
    }
}

impl From<&Error> for Diagnostic {
    fn from(error: &Error) -> Self {
        match error {
            Error::MalformedNode {
                node_type,
                location,
                ..
            } => Diagnostic {
                kind: DiagnosticKind::MalformedNode,
                node_type: node_type.clone(),
                location: *location,
                message: error.to_string(),
            },
            Error::UnsupportedShape {
                node_type,
                location,
            } => Diagnostic {
                kind: DiagnosticKind::UnsupportedShape,
                node_type: node_type.clone(),
                location: *location,
                message: error.to_string(),
            },
            other => Diagnostic {
                kind: DiagnosticKind::MalformedNode,
                node_type: String::new(),
                location: None,
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
