//! # Solidity-Sentinel Library
//!
//! @title Solidity-Sentinel - Static Analysis Security Scanner
//! @author Ramprasad
//!
//! A static analysis library for Solidity smart contracts that works on the AST
//! JSON emitted by the compiler.
//!
//! Each contract is normalized into an IR of indexed statements with modifiers
//! spliced into function bodies. Detectors then query that IR, using a path
//! algebra that selects the statements between two points while honoring the
//! exclusivity of if/else arms.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions and argument parsing
//! - [`parser`] - AST loading and extraction into the IR
//! - [`ir`] - Contract, function, statement and condition types
//! - [`analysis`] - Path index slicing and source resolution
//! - [`detectors`] - Vulnerability detection implementations
//! - [`report`] - Report aggregation and rendering
//! - [`scan`] - Batch scanning of artifact directories
//!
//! ## Example
//!
//! ```rust,ignore
//! use solidity_sentinel::scan::{scan, ScanOptions};
//!
//! let report = scan(Path::new("build/contracts"), &ScanOptions::default())?;
//! report.print_terminal();
//! ```

pub mod analysis;
pub mod cli;
pub mod detectors;
pub mod error;
pub mod ir;
pub mod parser;
pub mod report;
pub mod scan;

pub use analysis::AnalysisContext;
pub use cli::Cli;
pub use detectors::DetectorRegistry;
pub use error::{Diagnostic, Error, Result};
pub use parser::{extract_contract, AstIndex, Extraction};
pub use report::{Finding, Report, Severity};
