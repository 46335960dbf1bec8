//! # Vulnerability Detector Module
//!
//! @title Vulnerability Detection Framework
//! @author Ramprasad
//!
//! This module provides the framework for vulnerability detection and contains
//! implementations of all security detectors.
//!
//! ## Architecture
//!
//! All detectors implement the [`VulnerabilityDetector`] trait. A detector is
//! either function-scoped (run once per function of a contract) or
//! contract-scoped (run once over every function together). Each run yields a
//! [`DetectorResult`]: a score, a nominal score limit, verdict messages and the
//! findings behind the score. How score and limit are counted is documented on
//! each detector; a score may exceed its limit.
//!
//! ## Available Detectors
//!
//! | ID | Name | Scope | Severity |
//! |----|------|-------|----------|
//! | V001 | Unsecured Call | Function | High |
//! | V002 | Mishandled Error | Function | Medium |
//! | V003 | Over-Dependency on Block State | Function | Medium |
//! | V004 | Dangerous Delegatecall | Contract | High |

mod dangerous_delegates;
mod mishandled_errors;
mod over_dependency;
mod unsecured_calls;
pub mod utils;

pub use dangerous_delegates::DangerousDelegateDetector;
pub use mishandled_errors::MishandledErrorDetector;
pub use over_dependency::OverDependencyDetector;
pub use unsecured_calls::UnsecuredCallDetector;

use crate::analysis::AnalysisContext;
use crate::ir::{Function, PathIndex, SourceLocation};
use crate::report::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// What a detector runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Function,
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Okay,
    Info,
    Warning,
    Error,
}

/// A human-readable verdict line attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

/// A delegatecall forwarding `msg.data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateSite {
    pub function: String,
    pub path: PathIndex,
}

/// Detector-specific flags and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "detector", rename_all = "snake_case")]
pub enum Details {
    UnsecuredCalls {
        /// An interaction ran with no enclosing guard.
        no_checks_before: bool,
        /// Every guarded interaction had a guard variable updated before it.
        effects_checked_and_changed: bool,
    },
    MishandledErrors {
        no_success_values: usize,
        unchecked_success_values: usize,
        empty_check_bodies: usize,
    },
    OverDependency {
        found_assignments: bool,
        found_checks_leading_to_interaction: bool,
        found_return_variable: bool,
    },
    DangerousDelegates {
        /// Payable contract whose only interactions are delegatecalls.
        no_other_opcodes: bool,
        delegate_calls_with_msg_data: Vec<DelegateSite>,
    },
}

/// Outcome of one detector over one function or contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorResult {
    pub detector_id: String,
    pub name: String,
    pub score: usize,
    pub score_limit: usize,
    pub messages: Vec<Message>,
    pub details: Details,
    /// Collected into the report's flat finding list.
    #[serde(skip)]
    pub findings: Vec<Finding>,
}

impl DetectorResult {
    pub fn new(detector: &dyn VulnerabilityDetector, details: Details) -> Self {
        Self {
            detector_id: detector.id().to_string(),
            name: detector.name().to_string(),
            score: 0,
            score_limit: 0,
            messages: Vec::new(),
            details,
            findings: Vec::new(),
        }
    }

    pub fn message(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.messages.push(Message {
            kind,
            text: text.into(),
        });
    }

    /// Returns `true` if the detector flagged anything.
    pub fn is_positive(&self) -> bool {
        self.score > 0
    }
}

/// Trait for implementing vulnerability detectors.
///
/// All detectors must implement this trait to be registered with the
/// [`DetectorRegistry`]. A function-scoped detector overrides
/// [`detect_function`](VulnerabilityDetector::detect_function); a
/// contract-scoped one overrides [`scope`](VulnerabilityDetector::scope) and
/// [`detect_contract`](VulnerabilityDetector::detect_contract).
///
/// # Example Implementation
///
/// ```rust,ignore
/// pub struct MyDetector;
///
/// impl VulnerabilityDetector for MyDetector {
///     fn id(&self) -> &'static str { "V999" }
///     fn name(&self) -> &'static str { "My Vulnerability" }
///     fn description(&self) -> &'static str { "Detects my vulnerability" }
///     fn severity(&self) -> Severity { Severity::High }
///     fn remediation(&self) -> &'static str { "Fix the issue" }
///
///     fn detect_function(&self, context: &AnalysisContext, function: &Function) -> Option<DetectorResult> {
///         Some(DetectorResult::new(self, details))
///     }
/// }
/// ```
pub trait VulnerabilityDetector: Send + Sync {
    /// Returns the unique identifier for this detector.
    ///
    /// Format: "Vnnn" where nnn is a zero-padded number (e.g., "V001").
    fn id(&self) -> &'static str;

    /// Returns the human-readable name of the vulnerability.
    fn name(&self) -> &'static str;

    /// Returns a detailed description of what this detector looks for.
    fn description(&self) -> &'static str;

    /// Returns the default severity level for findings from this detector.
    fn severity(&self) -> Severity;

    fn scope(&self) -> Scope {
        Scope::Function
    }

    /// Runs the detector over one function.
    ///
    /// # Arguments
    ///
    /// * `context` - The contract under analysis and its sources
    /// * `function` - The function whose spliced sequence is inspected
    ///
    /// # Returns
    ///
    /// The scored result, or `None` for contract-scoped detectors.
    fn detect_function(&self, _context: &AnalysisContext, _function: &Function) -> Option<DetectorResult> {
        None
    }

    /// Runs the detector over the whole contract.
    fn detect_contract(&self, _context: &AnalysisContext) -> Option<DetectorResult> {
        None
    }

    /// Returns the CWE (Common Weakness Enumeration) ID if applicable.
    ///
    /// # Returns
    ///
    /// An optional CWE identifier string (e.g., "CWE-252").
    fn cwe(&self) -> Option<&'static str> {
        None
    }

    /// Returns remediation advice for addressing this vulnerability.
    fn remediation(&self) -> &'static str;
}

/// Registry containing all available vulnerability detectors.
///
/// The registry manages the collection of detectors and provides methods
/// to run them against analysis contexts.
///
/// # Example
///
/// ```rust,ignore
/// let registry = DetectorRegistry::new();
/// let results = registry.run_function(&context, function);
/// ```
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn VulnerabilityDetector>>,
}

impl DetectorRegistry {
    /// Creates a new registry with all default detectors, V001 through V004.
    pub fn new() -> Self {
        let detectors: Vec<Box<dyn VulnerabilityDetector>> = vec![
            Box::new(UnsecuredCallDetector),
            Box::new(MishandledErrorDetector),
            Box::new(OverDependencyDetector),
            Box::new(DangerousDelegateDetector),
        ];

        Self { detectors }
    }

    /// Creates a registry restricted by detector IDs.
    ///
    /// # Arguments
    ///
    /// * `only` - When non-empty, keep only these IDs
    /// * `exclude` - Drop these IDs
    pub fn with_filter(only: &[String], exclude: &[String]) -> Self {
        let mut registry = Self::new();
        registry.detectors.retain(|detector| {
            let id = detector.id();
            let wanted = only.is_empty() || only.iter().any(|o| o.eq_ignore_ascii_case(id));
            wanted && !exclude.iter().any(|e| e.eq_ignore_ascii_case(id))
        });
        registry
    }

    /// Returns a reference to all registered detectors.
    pub fn detectors(&self) -> &[Box<dyn VulnerabilityDetector>] {
        &self.detectors
    }

    /// Runs every function-scoped detector over `function`.
    ///
    /// # Arguments
    ///
    /// * `context` - The contract under analysis
    /// * `function` - One of the contract's functions
    ///
    /// # Returns
    ///
    /// One result per function-scoped detector, in registry order.
    pub fn run_function(&self, context: &AnalysisContext, function: &Function) -> Vec<DetectorResult> {
        self.detectors
            .iter()
            .filter(|detector| detector.scope() == Scope::Function)
            .filter_map(|detector| detector.detect_function(context, function))
            .collect()
    }

    /// Runs every contract-scoped detector.
    pub fn run_contract(&self, context: &AnalysisContext) -> Vec<DetectorResult> {
        self.detectors
            .iter()
            .filter(|detector| detector.scope() == Scope::Contract)
            .filter_map(|detector| detector.detect_contract(context))
            .collect()
    }

    /// Retrieves a detector by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The detector ID to look up
    ///
    /// # Returns
    ///
    /// A reference to the detector if found.
    pub fn get_detector(&self, id: &str) -> Option<&dyn VulnerabilityDetector> {
        self.detectors
            .iter()
            .find(|detector| detector.id().eq_ignore_ascii_case(id))
            .map(|detector| detector.as_ref())
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper function to create a finding from a detector.
///
/// Standardizes the creation of findings with consistent formatting.
///
/// # Arguments
///
/// * `detector` - The detector creating the finding
/// * `context` - The analysis context
/// * `location` - Code location identifier (`Contract::function @ path`)
/// * `src` - Source range used for the file, line and snippet
/// * `title` - Short title describing the finding
/// * `description` - Detailed description of the vulnerability
///
/// # Returns
///
/// A fully populated [`Finding`] instance.
pub fn create_finding(
    detector: &dyn VulnerabilityDetector,
    context: &AnalysisContext,
    location: String,
    src: Option<&SourceLocation>,
    title: String,
    description: String,
) -> Finding {
    Finding {
        id: format!("{}-{}", detector.id(), finding_hash(&location, &title)),
        detector_id: detector.id().to_string(),
        title,
        description,
        severity: detector.severity(),
        file_path: context.file_path(src),
        line: context.line(src),
        location,
        code_snippet: context.snippet(src),
        remediation: detector.remediation().to_string(),
        cwe: detector.cwe().map(|s| s.to_string()),
    }
}

/// `Contract::function @ path` location string.
pub fn statement_location(context: &AnalysisContext, function: &str, path: &PathIndex) -> String {
    format!("{}::{} @ {}", context.contract.name, function, path)
}

/// Stable suffix so repeated scans produce the same finding IDs.
fn finding_hash(location: &str, title: &str) -> String {
    let mut hasher = DefaultHasher::new();
    location.hash(&mut hasher);
    title.hash(&mut hasher);
    format!("{:08x}", hasher.finish() & 0xFFFF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = DetectorRegistry::new();
        assert_eq!(registry.detectors().len(), 4);
    }

    #[test]
    fn test_detector_ids_unique() {
        let registry = DetectorRegistry::new();
        let mut ids: Vec<_> = registry.detectors().iter().map(|d| d.id()).collect();
        let len_before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len_before, "Detector IDs must be unique");
    }

    #[test]
    fn test_filter_only_and_exclude() {
        let only = DetectorRegistry::with_filter(&["v001".to_string(), "V004".to_string()], &[]);
        let ids: Vec<_> = only.detectors().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["V001", "V004"]);

        let excluded = DetectorRegistry::with_filter(&[], &["V003".to_string()]);
        assert!(excluded.get_detector("V003").is_none());
        assert!(excluded.get_detector("V002").is_some());
    }

    #[test]
    fn test_scopes() {
        let registry = DetectorRegistry::new();
        let contract_scoped: Vec<_> = registry
            .detectors()
            .iter()
            .filter(|d| d.scope() == Scope::Contract)
            .map(|d| d.id())
            .collect();
        assert_eq!(contract_scoped, vec!["V004"]);
    }

    #[test]
    fn test_finding_hash_is_stable() {
        assert_eq!(finding_hash("A::f @ 0", "t"), finding_hash("A::f @ 0", "t"));
        assert_ne!(finding_hash("A::f @ 0", "t"), finding_hash("A::f @ 1", "t"));
    }
}
