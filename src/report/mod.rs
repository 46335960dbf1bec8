//! # Report Generation Module
//!
//! @title Security Report Generator
//! @author Ramprasad
//!
//! Rolls detector results up into per-function, per-contract and scan-wide
//! reports, and renders them for the terminal, Markdown, JSON and GitHub
//! Actions annotations.
//!
//! ## Key Types
//!
//! - [`Report`] - Complete scan report
//! - [`ContractReport`] - Detector results of one contract, with totals
//! - [`Finding`] - Individual flagged statement
//! - [`Severity`] - Severity classification for findings

mod finding;
mod formatter;

pub use finding::{Finding, Severity};
pub use formatter::{render_tree, to_markdown};

use crate::detectors::DetectorResult;
use crate::error::{Diagnostic, Result};
use crate::ir::{Contract, Function, Statement};
use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete security analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,

    pub contracts: Vec<ContractReport>,

    /// Findings of every contract, most severe first.
    pub findings: Vec<Finding>,

    /// Finding counts by severity.
    pub summary: ReportSummary,
}

/// Metadata about the scan operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Tool version used for the scan.
    pub version: String,

    /// Unix timestamp of the scan.
    pub timestamp: String,

    /// Path that was scanned, relative to the working directory when possible.
    pub scanned_path: String,

    /// Number of AST documents loaded.
    pub artifacts_loaded: usize,

    pub contracts_analyzed: usize,
}

/// Summary of findings by severity level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

/// Detector results for one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionReport {
    pub name: String,
    pub visibility: String,
    pub state_mutability: String,
    /// Names of the spliced modifiers, in attachment order.
    pub modifiers: Vec<String>,
    pub results: Vec<DetectorResult>,
    /// The spliced statement IR, only kept on request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<Statement>>,
}

impl FunctionReport {
    pub fn new(function: &Function, results: Vec<DetectorResult>, include_sequence: bool) -> Self {
        Self {
            name: function.name.clone(),
            visibility: function.visibility.clone(),
            state_mutability: function.state_mutability.clone(),
            modifiers: function.modifiers.iter().map(|m| m.name.clone()).collect(),
            results,
            sequence: include_sequence.then(|| function.sequence.clone()),
        }
    }
}

/// Per-detector totals over the functions of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorTally {
    pub detector_id: String,
    pub name: String,
    /// Functions with a score above zero.
    pub positives: usize,
    /// Summed function scores.
    pub score: usize,
    /// Summed function score limits.
    pub score_limit: usize,
}

/// Detector results for one contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractReport {
    pub name: String,
    pub kind: String,
    pub source_path: String,
    pub payable: bool,
    pub bases: Vec<String>,
    pub functions: Vec<FunctionReport>,
    /// Results of contract-scoped detectors.
    pub contract_results: Vec<DetectorResult>,
    /// Function-scoped detector totals, in registry order.
    pub totals: Vec<DetectorTally>,
    /// Sub-trees skipped during extraction.
    pub diagnostics: Vec<Diagnostic>,
}

impl ContractReport {
    /// Builds a contract report and its per-detector totals.
    ///
    /// # Arguments
    ///
    /// * `contract` - The analyzed contract
    /// * `source_path` - File the contract is declared in
    /// * `functions` - Per-function detector results
    /// * `contract_results` - Results of contract-scoped detectors
    /// * `diagnostics` - Extraction diagnostics for the contract
    pub fn new(
        contract: &Contract,
        source_path: String,
        functions: Vec<FunctionReport>,
        contract_results: Vec<DetectorResult>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let totals = tally(&functions);
        Self {
            name: contract.name.clone(),
            kind: contract.kind.clone(),
            source_path,
            payable: contract.payable,
            bases: contract.bases.clone(),
            functions,
            contract_results,
            totals,
            diagnostics,
        }
    }

    /// Findings of every function and contract-scoped result.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.functions
            .iter()
            .flat_map(|f| f.results.iter())
            .chain(self.contract_results.iter())
            .flat_map(|r| r.findings.iter())
    }

    fn print_terminal(&self) {
        let payable = if self.payable {
            " payable".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "\n{} {} {}{}",
            "[*]".cyan(),
            self.kind.dimmed(),
            self.name.white().bold(),
            payable
        );
        println!("    {}", self.source_path.dimmed());

        for function in &self.functions {
            let scores: Vec<String> = function
                .results
                .iter()
                .map(|r| score_label(r.detector_id.as_str(), r.score, r.score_limit))
                .collect();
            println!("    {:<28} {}", function.name, scores.join("  "));
        }
        for result in &self.contract_results {
            println!(
                "    {:<28} {}",
                "(contract)".dimmed(),
                score_label(&result.detector_id, result.score, result.score_limit)
            );
        }
        if !self.diagnostics.is_empty() {
            println!(
                "    {} {} sub-tree(s) skipped during extraction",
                "[~]".yellow(),
                self.diagnostics.len()
            );
        }
    }
}

fn score_label(id: &str, score: usize, limit: usize) -> String {
    let label = format!("{} {}/{}", id, score, limit);
    if score > 0 {
        label.red().to_string()
    } else {
        label.green().to_string()
    }
}

/// Sums function results per detector, in the order detectors first appear.
fn tally(functions: &[FunctionReport]) -> Vec<DetectorTally> {
    let mut order = Vec::new();
    let mut totals: BTreeMap<String, DetectorTally> = BTreeMap::new();
    for result in functions.iter().flat_map(|f| f.results.iter()) {
        let entry = totals.entry(result.detector_id.clone()).or_insert_with(|| {
            order.push(result.detector_id.clone());
            DetectorTally {
                detector_id: result.detector_id.clone(),
                name: result.name.clone(),
                positives: 0,
                score: 0,
                score_limit: 0,
            }
        });
        entry.positives += usize::from(result.is_positive());
        entry.score += result.score;
        entry.score_limit += result.score_limit;
    }
    order
        .into_iter()
        .filter_map(|id| totals.remove(&id))
        .collect()
}

impl Report {
    /// Creates a report from analyzed contracts.
    ///
    /// # Arguments
    ///
    /// * `contracts` - Per-contract results
    /// * `scanned_path` - Display form of the scanned path
    /// * `artifacts_loaded` - Number of AST documents read
    ///
    /// # Returns
    ///
    /// A report whose findings are sorted most severe first.
    pub fn new(contracts: Vec<ContractReport>, scanned_path: String, artifacts_loaded: usize) -> Self {
        let mut findings: Vec<Finding> = contracts
            .iter()
            .flat_map(ContractReport::findings)
            .cloned()
            .collect();
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.file_path.cmp(&b.file_path))
                .then_with(|| a.line.cmp(&b.line))
        });

        let metadata = ReportMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono_lite_timestamp(),
            scanned_path,
            artifacts_loaded,
            contracts_analyzed: contracts.len(),
        };

        Self {
            metadata,
            summary: ReportSummary::from_findings(&findings),
            contracts,
            findings,
        }
    }

    /// Drops findings below `min` and recounts the summary.
    ///
    /// Detector scores are left as computed.
    pub fn retain_severity(&mut self, min: Severity) {
        self.findings.retain(|f| f.severity >= min);
        self.summary = ReportSummary::from_findings(&self.findings);
    }

    /// Prints per-contract scores and every finding.
    pub fn print_terminal(&self) {
        for contract in &self.contracts {
            contract.print_terminal();
        }

        if self.findings.is_empty() {
            println!("\n{}", "[+] No vulnerabilities found.".green().bold());
            return;
        }

        println!("\n{}", "[!] Security Findings:".red().bold());
        println!("{}", "=".repeat(60).cyan());

        for (i, finding) in self.findings.iter().enumerate() {
            finding.print_terminal(i + 1);
        }
    }

    /// Prints summary statistics to the terminal.
    pub fn print_summary(&self) {
        println!(
            "{}",
            format!(
                "[*] Summary: {} contract(s) | {} High | {} Medium | {} Low | {} Info",
                self.metadata.contracts_analyzed,
                self.summary.high + self.summary.critical,
                self.summary.medium,
                self.summary.low,
                self.summary.info
            )
            .bold()
        );

        let message = format!("[!] Total: {} issue(s) found", self.summary.total);
        if self.summary.total == 0 {
            println!("{}", "[+] No issues found.".green().bold());
        } else if self.summary.critical + self.summary.high > 0 {
            println!("{}", message.red().bold());
        } else {
            println!("{}", message.yellow().bold());
        }
    }

    /// GitHub Actions workflow commands, one per finding.
    pub fn github_annotations(&self) -> Vec<String> {
        self.findings.iter().map(Finding::github_annotation).collect()
    }

    /// Renders the report as Markdown.
    ///
    /// # Errors
    ///
    /// [`crate::error::Error::Template`] if the report template fails to render.
    pub fn to_markdown(&self) -> Result<String> {
        to_markdown(self)
    }
}

impl ReportSummary {
    fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = ReportSummary {
            total: findings.len(),
            ..Default::default()
        };

        for finding in findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }

        summary
    }
}

/// Seconds since the Unix epoch.
fn chrono_lite_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}
