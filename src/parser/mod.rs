//! # Parser Module
//!
//! @title Solidity AST Extraction
//! @author Ramprasad
//!
//! Turns solc AST JSON into the normalized IR in [`crate::ir`]. Extraction is
//! single-pass and read-only over the loaded documents.
//!
//! ## Submodules
//!
//! - [`document`] - Loads compiler output and indexes contracts by name
//! - [`node`] - Typed accessors over raw AST objects
//! - [`opcode`] - Classifies call expressions into opcodes
//! - `conditions` - Flattens expressions into condition records
//! - `sequence` - Normalizes statement blocks and assigns path indexes
//! - `modifiers` - Splices modifier bodies around function bodies
//! - `contract` - Assembles fields, modifiers and functions of a contract
//!
//! ## Key Types
//!
//! - [`AstIndex`] - Every loaded source unit, searchable by contract name
//! - [`Extractor`] - Extraction state, collects [`Diagnostic`] records
//! - [`Extraction`] - A contract IR plus the diagnostics met building it

mod conditions;
mod contract;
pub mod document;
mod modifiers;
pub mod node;
pub mod opcode;
mod sequence;

#[cfg(test)]
pub(crate) mod testing;

pub use conditions::member_path;
pub use document::{read_document, AstIndex, SourceFile};
pub use modifiers::splice_modifiers;
pub use node::{Node, NodeType};
pub use sequence::assign_paths;

use crate::error::{Diagnostic, Error, Result};
use crate::ir::Contract;
use serde::Serialize;

/// A contract IR together with the omissions recorded while building it.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub contract: Contract,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extraction state for one contract.
///
/// Malformed or unsupported sub-trees never abort extraction; they are recorded
/// through [`Extractor::record`] and skipped.
pub struct Extractor<'a> {
    index: &'a AstIndex,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Extractor<'a> {
    pub fn new(index: &'a AstIndex) -> Self {
        Self {
            index,
            diagnostics: Vec::new(),
        }
    }

    /// Records a non-fatal extraction error.
    pub(crate) fn record(&mut self, error: Error) {
        self.diagnostics.push(Diagnostic::from(&error));
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Extracts the named contract from `index`.
///
/// # Arguments
///
/// * `index` - Loaded source units
/// * `name` - Contract name as declared in source
///
/// # Returns
///
/// The contract IR and its diagnostics, or [`Error::NotFound`] if no loaded unit
/// declares `name`. Each diagnostic is also logged as a warning.
pub fn extract_contract(index: &AstIndex, name: &str) -> Result<Extraction> {
    let mut extractor = Extractor::new(index);
    let contract = extractor.contract(name)?;
    let diagnostics = extractor.into_diagnostics();
    for diagnostic in &diagnostics {
        log::warn!("{}: {}", name, diagnostic);
    }
    Ok(Extraction {
        contract,
        diagnostics,
    })
}
