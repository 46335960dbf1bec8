//! # Finding and Severity Definitions
//!
//! @title Security Finding Data Structures
//! @author Ramprasad
//!
//! A [`Finding`] is one flagged statement (or contract, for contract-wide
//! checks) together with the source position it resolves to.

use colored::*;
use serde::{Deserialize, Serialize};

/// Severity level classification for security findings.
///
/// Ordered from lowest to highest severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Severity {
    /// Parses a severity level from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - Case-insensitive severity name
    ///
    /// # Returns
    ///
    /// The corresponding `Severity` variant, defaulting to `Info` for unknown values.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Info,
        }
    }

    /// Returns a colored label for terminal output.
    pub fn colored_label(&self) -> ColoredString {
        match self {
            Severity::Critical => "CRITICAL".white().on_red().bold(),
            Severity::High => "HIGH".black().on_yellow().bold(),
            Severity::Medium => "MEDIUM".white().on_bright_blue().bold(),
            Severity::Low => "LOW".black().on_white().bold(),
            Severity::Info => "INFO".black().on_bright_white(),
        }
    }

    /// GitHub Actions annotation level for findings of this severity.
    pub fn annotation_level(&self) -> &'static str {
        match self {
            Severity::Critical | Severity::High => "error",
            Severity::Medium => "warning",
            Severity::Low | Severity::Info => "notice",
        }
    }

    pub fn markdown_badge(&self) -> &'static str {
        match self {
            Severity::Critical => "![Critical](https://img.shields.io/badge/severity-CRITICAL-red)",
            Severity::High => "![High](https://img.shields.io/badge/severity-HIGH-orange)",
            Severity::Medium => "![Medium](https://img.shields.io/badge/severity-MEDIUM-yellow)",
            Severity::Low => "![Low](https://img.shields.io/badge/severity-LOW-blue)",
            Severity::Info => "![Info](https://img.shields.io/badge/severity-INFO-lightgrey)",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
        };
        write!(f, "{}", label)
    }
}

/// A flagged statement or contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Detector ID plus a hash of location and title, stable across scans.
    pub id: String,

    /// ID of the detector that produced this finding (e.g., "V001").
    pub detector_id: String,

    pub title: String,

    pub description: String,

    pub severity: Severity,

    /// Source file of the flagged node, as recorded in the AST.
    pub file_path: String,

    /// 1-based line, 0 when the artifact carries no source text.
    pub line: usize,

    /// `Contract::function @ path`, or the contract name for contract-wide findings.
    pub location: String,

    /// Source lines of the flagged node, when available.
    pub code_snippet: Option<String>,

    pub remediation: String,

    /// CWE (Common Weakness Enumeration) identifier if applicable.
    pub cwe: Option<String>,
}

impl Finding {
    /// Prints the finding to terminal with color formatting.
    ///
    /// # Arguments
    ///
    /// * `index` - The finding number for display.
    pub fn print_terminal(&self, index: usize) {
        println!();
        println!(
            "{} {} [{}] {}",
            format!("#{}", index).cyan().bold(),
            self.severity.colored_label(),
            self.detector_id.yellow(),
            self.title.white().bold()
        );

        let position = if self.line > 0 {
            format!("{}:{}", self.file_path, self.line)
        } else {
            self.file_path.clone()
        };
        println!("   {} {}", "Location:".dimmed(), position.blue());
        println!("   {} {}", "Statement:".dimmed(), self.location.cyan());

        for line in self.description.lines() {
            println!("   {}", line.dimmed());
        }

        if let Some(ref snippet) = self.code_snippet {
            println!("\n   {}", "Code:".yellow());
            for line in snippet.lines() {
                println!("   {}", line.bright_white());
            }
        }

        if let Some(ref cwe) = self.cwe {
            println!("   {} {}", "Reference:".dimmed(), cwe.blue());
        }

        println!("\n   {}", "Remediation:".green());
        for line in self.remediation.lines() {
            println!("   {}", line.green().dimmed());
        }

        println!("{}", "-".repeat(60).dimmed());
    }

    /// One GitHub Actions workflow command for this finding.
    pub fn github_annotation(&self) -> String {
        let message = self.description.replace('\n', "%0A");
        if self.line > 0 {
            format!(
                "::{} file={},line={},title={} {}::{}",
                self.severity.annotation_level(),
                self.file_path,
                self.line,
                self.detector_id,
                self.title,
                message
            )
        } else {
            format!(
                "::{} file={},title={} {}::{}",
                self.severity.annotation_level(),
                self.file_path,
                self.detector_id,
                self.title,
                message
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(line: usize) -> Finding {
        Finding {
            id: "V002-0000abcd".to_string(),
            detector_id: "V002".to_string(),
            title: "Result of `send` discarded".to_string(),
            description: "first\nsecond".to_string(),
            severity: Severity::Medium,
            file_path: "contracts/Bank.sol".to_string(),
            line,
            location: "Bank::pay @ 0".to_string(),
            code_snippet: None,
            remediation: "Check it".to_string(),
            cwe: Some("CWE-252".to_string()),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!(Severity::from_str("critical"), Severity::Critical);
        assert_eq!(Severity::from_str("HIGH"), Severity::High);
        assert_eq!(Severity::from_str("unknown"), Severity::Info);
    }

    #[test]
    fn test_github_annotation() {
        assert_eq!(
            finding(12).github_annotation(),
            "::warning file=contracts/Bank.sol,line=12,title=V002 Result of `send` discarded::first%0Asecond"
        );
        assert!(!finding(0).github_annotation().contains("line="));
    }
}
