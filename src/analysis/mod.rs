//! # Analysis Module
//!
//! @title Flow-Sensitive Analysis Support
//! @author Ramprasad
//!
//! Shared machinery the detectors run on top of the extracted IR.
//!
//! ## Components
//!
//! - **Slicing**: Path index algebra over statement sequences
//! - **Context**: Source resolution for findings (file, line, snippet)

pub mod slicing;

pub use slicing::{between, start_from, stop_at, SequenceView};

use crate::ir::{Contract, SourceLocation};
use crate::parser::AstIndex;

/// Everything a detector needs besides the function under analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub contract: &'a Contract,
    pub index: &'a AstIndex,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(contract: &'a Contract, index: &'a AstIndex) -> Self {
        Self { contract, index }
    }

    /// Path of the file a location belongs to, falling back to the contract's
    /// declaring unit.
    pub fn file_path(&self, location: Option<&SourceLocation>) -> String {
        location
            .and_then(|loc| self.index.source_file(loc.file))
            .map(|file| file.path.clone())
            .or_else(|| self.index.contract_path(&self.contract.name).map(str::to_string))
            .unwrap_or_else(|| format!("<{}>", self.contract.name))
    }

    /// 1-based line, 0 when the source text is unavailable.
    pub fn line(&self, location: Option<&SourceLocation>) -> usize {
        location
            .and_then(|loc| self.index.line_of(loc))
            .unwrap_or(0)
    }

    pub fn snippet(&self, location: Option<&SourceLocation>) -> Option<String> {
        location.and_then(|loc| self.index.snippet(loc, 3))
    }
}
