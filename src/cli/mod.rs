//! # CLI Module
//!
//! @title Command Line Interface
//! @author Ramprasad
//!
//! This module defines the command-line interface for Solidity-Sentinel using
//! the `clap` derive macros for declarative argument parsing.
//!
//! ## Commands
//!
//! - `scan` - Analyze compiled contracts for vulnerabilities
//! - `extract` - Print the normalized IR of one contract
//! - `list` - Display available vulnerability detectors
//! - `version` - Show version information

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidity-Sentinel command-line interface.
///
/// A static analysis security scanner for Solidity contracts. Works on the
/// AST JSON the compiler emits (Truffle artifacts, Hardhat build-info, solc
/// standard-JSON output or bare `SourceUnit`s).
#[derive(Parser, Debug)]
#[command(name = "solidity-sentinel")]
#[command(author = "Ramprasad")]
#[command(version)]
#[command(about = "Static analysis security scanner for Solidity contracts, driven by compiler ASTs")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the Solidity-Sentinel CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan compiled contracts for security vulnerabilities.
    ///
    /// Runs the unsecured call, mishandled error, block state dependency and
    /// dangerous delegatecall detectors over every function of every target
    /// contract.
    Scan {
        /// Artifact file, directory of artifacts, or glob pattern.
        ///
        /// Directories are searched for `.json` files; `node_modules` is skipped.
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Scan directories recursively.
        #[arg(short, long, default_value_t = true)]
        recursive: bool,

        /// Contracts to analyze (defaults to every non-interface contract).
        ///
        /// Comma-separated or repeated. Each must exist in the loaded ASTs.
        #[arg(short, long = "contract", value_delimiter = ',')]
        contracts: Vec<String>,

        /// Report only this function of each target contract.
        #[arg(long)]
        function: Option<String>,

        /// Output format for the security report.
        ///
        /// Supported formats:
        /// - `terminal`: Colorized console output (default)
        /// - `json`: Machine-readable JSON format
        /// - `markdown`: Human-readable Markdown report
        /// - `github`: GitHub Actions annotations
        #[arg(short, long, default_value = "terminal")]
        format: String,

        /// Output directory for Markdown and JSON reports.
        ///
        /// If not specified, reports are printed to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum severity level to include in results.
        ///
        /// Valid values: high, medium, low, info
        #[arg(short, long)]
        severity: Option<String>,

        /// Exclude specific detectors from the scan.
        ///
        /// Comma-separated list of detector IDs to skip.
        /// Example: --exclude V003
        #[arg(short = 'x', long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Include only specific detectors in the scan.
        ///
        /// Comma-separated list of detector IDs to run.
        /// Example: --only V001,V002
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Keep each function's statement IR in the JSON report.
        #[arg(long)]
        include_sequence: bool,

        /// Exit with status 1 when findings remain after filtering.
        #[arg(long)]
        fail_on_findings: bool,
    },

    /// Print the normalized IR of one contract.
    ///
    /// Shows fields, functions and their modifier-spliced statement sequences
    /// with path indexes.
    Extract {
        /// Artifact file, directory of artifacts, or glob pattern.
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Contract to extract.
        #[arg(short, long)]
        contract: String,

        /// Print JSON instead of an indented tree.
        #[arg(long)]
        json: bool,
    },

    /// List all available vulnerability detectors.
    ///
    /// Displays the ID, name, severity, scope, and description of each
    /// registered vulnerability detector.
    List,

    /// Print version information.
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Verify that the CLI definition is valid.
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_arguments() {
        let cli = Cli::parse_from([
            "solidity-sentinel",
            "scan",
            "build/contracts",
            "-c",
            "Bank,Vault",
            "--only",
            "V001,V004",
            "--fail-on-findings",
        ]);
        match cli.command {
            Commands::Scan {
                contracts,
                only,
                fail_on_findings,
                recursive,
                ..
            } => {
                assert_eq!(contracts, vec!["Bank", "Vault"]);
                assert_eq!(only, vec!["V001", "V004"]);
                assert!(fail_on_findings);
                assert!(recursive);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
